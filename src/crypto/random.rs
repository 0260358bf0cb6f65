//! Operating-system randomness for salts and nonces.

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::errors::{Result, WardedError};

/// Fill `buf` with bytes from the OS CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| WardedError::RandomSource(e.to_string()))
}

/// Return `len` fresh random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf)?;
    Ok(buf)
}
