//! Pinning of master keys, observed through the kernel's locked-memory
//! counter.  Kept as the only test in this binary so no other test
//! locks memory while it measures.

#![cfg(target_os = "linux")]

use warded::crypto::SecureKey;

/// `VmLck` of this process in bytes.
fn locked_bytes() -> usize {
    let status = std::fs::read_to_string("/proc/self/status").unwrap();
    let line = status
        .lines()
        .find(|l| l.starts_with("VmLck:"))
        .expect("VmLck line");
    let kb: usize = line
        .trim_start_matches("VmLck:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .unwrap();
    kb * 1024
}

fn page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    usize::try_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).unwrap()
}

#[test]
fn dropping_one_key_keeps_the_other_pinned() {
    let base = locked_bytes();
    let page = page_size();

    let mut current = SecureKey::new(b"old master key".to_vec());
    let mut next = SecureKey::new(b"new master key".to_vec());
    if current.lock().is_err() || next.lock().is_err() {
        return; // RLIMIT_MEMLOCK too small to measure anything
    }
    assert_eq!(locked_bytes(), base + 2 * page);

    drop(next);
    assert!(current.is_locked());
    assert_eq!(locked_bytes(), base + page);
    assert_eq!(current.as_bytes(), b"old master key");

    drop(current);
    assert_eq!(locked_bytes(), base);
}
