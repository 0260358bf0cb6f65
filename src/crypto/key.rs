//! Key material held in pinned, wipe-on-release memory.
//!
//! A `SecureKey` owns the master key bytes for the duration of one
//! command.  `lock` moves them into an anonymous mapping of their own
//! and pins it with `mlock(2)` so it is never written to swap.  Page
//! locks do not nest, so two keys must never share a page: a key that
//! unpins its pages cannot unpin another key's bytes.  `release`
//! overwrites every byte with zero and then unpins.  `Drop` calls
//! `release`, so the wipe happens on every exit path, including early
//! returns through `?`.

use std::fmt;

use memmap2::MmapMut;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, WardedError};

/// Bytes produced by a key derivation function, zeroed on drop.
pub type DerivedKey = Zeroizing<Vec<u8>>;

/// An owned master key that can be pinned in physical memory.
pub struct SecureKey {
    /// Key bytes until `lock` moves them into `pinned`.
    heap: Vec<u8>,
    /// Page-aligned mapping owned by this key alone, once locked.
    pinned: Option<MmapMut>,
    len: usize,
    released: bool,
}

impl SecureKey {
    /// Take ownership of raw key bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            len: bytes.len(),
            heap: bytes,
            pinned: None,
            released: false,
        }
    }

    /// Take ownership of a key typed by the user.
    pub fn from_string(key: String) -> Self {
        Self::new(key.into_bytes())
    }

    /// Access the raw key bytes (e.g. to feed a key derivation function).
    pub fn as_bytes(&self) -> &[u8] {
        match &self.pinned {
            Some(region) => &region[..self.len],
            None => &self.heap,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `lock` succeeded and `release` has not run yet.
    pub fn is_locked(&self) -> bool {
        self.pinned.is_some()
    }

    /// Move the key onto pages of its own and pin them.
    ///
    /// Fails with `MemoryLock` when the mapping cannot be created, the
    /// platform has no `mlock` or the process lacks permission (e.g.
    /// `RLIMIT_MEMLOCK` exhausted).  On failure the key stays usable on
    /// the heap; the caller decides whether that is fatal.
    pub fn lock(&mut self) -> Result<()> {
        if self.pinned.is_some() || self.len == 0 {
            return Ok(());
        }
        if self.released {
            return Err(WardedError::MemoryLock("key was already released".into()));
        }

        let mut region = MmapMut::map_anon(self.len)
            .map_err(|e| WardedError::MemoryLock(format!("anonymous mapping: {e}")))?;
        // The mapping starts on a page boundary and nothing else lives in
        // its pages, so pinning `region.len()` bytes pins whole pages.
        mlock(region.as_ptr(), region.len())?;

        region[..self.len].copy_from_slice(&self.heap);
        self.heap.zeroize();
        self.pinned = Some(region);
        Ok(())
    }

    /// Overwrite every byte with zero, then unpin.
    ///
    /// Safe to call more than once; only the first call does anything.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.heap.zeroize();

        if let Some(mut region) = self.pinned.take() {
            region[..].zeroize();
            // Nothing useful can be done if munlock fails here; the
            // mapping is removed on drop either way.
            let _ = munlock(region.as_ptr(), region.len());
        }
        self.len = 0;
    }
}

impl Drop for SecureKey {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureKey")
            .field("len", &self.len)
            .field("locked", &self.is_locked())
            .field("released", &self.released)
            .finish()
    }
}

/// Pin every current and future page of the process (`mlockall`).
///
/// Opt-in through `lock_all_memory` in the settings file: with
/// `MCL_FUTURE` any later allocation that cannot be pinned fails.
pub fn lock_all_memory() -> Result<()> {
    #[cfg(unix)]
    {
        // SAFETY: mlockall takes only flags and touches no Rust-owned memory.
        let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
        if rc != 0 {
            return Err(WardedError::MemoryLock(format!(
                "mlockall: {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        Err(WardedError::MemoryLock(
            "mlockall is not supported on this platform".into(),
        ))
    }
}

#[cfg(unix)]
fn mlock(ptr: *const u8, len: usize) -> Result<()> {
    // SAFETY: ptr/len describe a live allocation owned by the caller.
    let rc = unsafe { libc::mlock(ptr.cast::<libc::c_void>(), len) };
    if rc != 0 {
        return Err(WardedError::MemoryLock(format!(
            "mlock: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn munlock(ptr: *const u8, len: usize) -> Result<()> {
    // SAFETY: ptr/len describe the region previously passed to mlock.
    let rc = unsafe { libc::munlock(ptr.cast::<libc::c_void>(), len) };
    if rc != 0 {
        return Err(WardedError::MemoryLock(format!(
            "munlock: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn mlock(_ptr: *const u8, _len: usize) -> Result<()> {
    Err(WardedError::MemoryLock(
        "mlock is not supported on this platform".into(),
    ))
}

#[cfg(not(unix))]
fn munlock(_ptr: *const u8, _len: usize) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_zeroes_and_is_idempotent() {
        let mut key = SecureKey::new(b"correct horse".to_vec());
        assert_eq!(key.len(), 13);

        key.release();
        assert!(key.as_bytes().iter().all(|b| *b == 0));
        assert!(key.is_empty());
        assert!(!key.is_locked());

        // Second call is a no-op.
        key.release();
        assert!(!key.is_locked());
    }

    #[test]
    fn lock_after_release_pins_nothing() {
        let mut key = SecureKey::from_string("battery staple".to_string());
        key.release();
        assert!(key.is_empty());
        assert!(key.lock().is_ok());
        assert!(!key.is_locked());
    }

    #[test]
    fn empty_key_lock_is_noop() {
        let mut key = SecureKey::new(Vec::new());
        assert!(key.lock().is_ok());
        assert!(!key.is_locked());
    }

    #[test]
    fn lock_reports_capability_errors_without_panicking() {
        let mut key = SecureKey::new(vec![7u8; 32]);
        match key.lock() {
            Ok(()) => assert!(key.is_locked()),
            Err(WardedError::MemoryLock(_)) => assert!(!key.is_locked()),
            Err(other) => panic!("unexpected error: {other}"),
        }
        key.release();
        assert!(!key.is_locked());
    }

    #[cfg(unix)]
    fn page_size() -> usize {
        // SAFETY: sysconf has no memory-safety preconditions.
        usize::try_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn locked_keys_never_share_a_page() {
        let mut a = SecureKey::new(b"first".to_vec());
        let mut b = SecureKey::new(b"second".to_vec());
        if a.lock().is_err() || b.lock().is_err() {
            return; // no mlock budget here
        }

        let page = page_size();
        let pa = a.as_bytes().as_ptr() as usize;
        let pb = b.as_bytes().as_ptr() as usize;
        assert_eq!(pa % page, 0);
        assert_eq!(pb % page, 0);
        assert_ne!(pa / page, pb / page);

        drop(b);
        assert!(a.is_locked());
        assert_eq!(a.as_bytes(), b"first");
    }

    #[test]
    fn lock_keeps_the_key_bytes() {
        let mut key = SecureKey::new(b"correct horse".to_vec());
        if key.lock().is_ok() {
            assert!(key.is_locked());
        }
        assert_eq!(key.as_bytes(), b"correct horse");
        assert_eq!(key.len(), 13);
    }

    #[test]
    fn debug_output_redacts_bytes() {
        let key = SecureKey::new(b"hunter2".to_vec());
        let shown = format!("{key:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("len: 7"));
    }
}
