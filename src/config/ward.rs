//! Resolved per-ward algorithm configuration.

use crate::crypto::{CipherKind, KeyDerivation};

/// The algorithms new records in a ward are created with.
///
/// Existing records keep whatever they were written with; their tags
/// travel with them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WardConfig {
    pub cipher: CipherKind,
    /// Template instance: parameters only, the salt is drawn per record.
    pub key_derivation: KeyDerivation,
}

impl WardConfig {
    pub fn new(cipher: CipherKind, key_derivation: KeyDerivation) -> Self {
        Self {
            cipher,
            key_derivation,
        }
    }
}
