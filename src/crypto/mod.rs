//! Cryptographic primitives for Warded.
//!
//! This module provides:
//! - `SecureKey`, pinned and wiped master-key storage (`key`)
//! - scrypt key derivation with per-record salts (`kdf`)
//! - ChaCha20-Poly1305 / XSalsa20-Poly1305 sealing (`cipher`)
//! - OS randomness for salts and nonces (`random`)

pub mod cipher;
pub mod kdf;
pub mod key;
pub mod random;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{Cipher, KeyDerivation, SecureKey, ...};
pub use cipher::{Cipher, CipherKind};
pub use kdf::{KeyDerivation, KeyDerivationKind, Scrypt, ScryptParams};
pub use key::{lock_all_memory, DerivedKey, SecureKey};
