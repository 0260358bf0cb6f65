//! Master-key stretching with scrypt.
//!
//! Every record carries its own `KeyDerivation`: the algorithm, its cost
//! parameters and a per-record salt.  Deriving is a pure function of
//! (master key, salt, parameters, output length), so decryption
//! reproduces the key used at encryption time.  The salt is replaced by
//! `refresh_salt` before every new encryption and never before a
//! decryption.

use crate::crypto::key::{DerivedKey, SecureKey};
use crate::crypto::random::random_bytes;
use crate::errors::{Result, WardedError};

use zeroize::Zeroizing;

/// Length of a freshly drawn scrypt salt in bytes.
pub const SCRYPT_SALT_LEN: usize = 8;

/// Nominal output length handed to `scrypt::Params`; the real length
/// comes from the caller's output buffer.
const SCRYPT_PARAMS_LEN: usize = 32;

/// Algorithms a record can name in its `keyDerivation.type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyDerivationKind {
    #[default]
    Scrypt,
}

impl KeyDerivationKind {
    /// Canonical lowercase name written to disk.
    pub fn name(self) -> &'static str {
        match self {
            KeyDerivationKind::Scrypt => "scrypt",
        }
    }

    /// Strict, case-insensitive lookup.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "scrypt" => Some(KeyDerivationKind::Scrypt),
            _ => None,
        }
    }

    /// Lenient lookup: unknown names resolve to the default.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// Historical numeric discriminant (`0` = scrypt).
    pub fn from_discriminant(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(KeyDerivationKind::Scrypt),
            _ => None,
        }
    }
}

/// scrypt cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    /// CPU/memory cost, must be a power of two greater than one.
    pub n: u64,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self {
            n: 16_384, // 2^14
            r: 8,
            p: 1,
        }
    }
}

impl ScryptParams {
    fn to_scrypt(self) -> Result<scrypt::Params> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(WardedError::KeyDerivationFailed(format!(
                "scrypt N must be a power of two greater than 1 (got {})",
                self.n
            )));
        }
        // trailing_zeros of a u64 is at most 63, always fits a u8.
        let log_n = self.n.trailing_zeros() as u8;
        scrypt::Params::new(log_n, self.r, self.p, SCRYPT_PARAMS_LEN).map_err(|e| {
            WardedError::KeyDerivationFailed(format!("invalid scrypt params: {e}"))
        })
    }
}

/// scrypt parameters plus the salt of one record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scrypt {
    pub params: ScryptParams,
    pub salt: Vec<u8>,
}

impl Scrypt {
    fn derive(&self, password: &[u8], len: usize) -> Result<DerivedKey> {
        let params = self.params.to_scrypt()?;
        let mut key = Zeroizing::new(vec![0u8; len]);
        scrypt::scrypt(password, &self.salt, &params, key.as_mut_slice())
            .map_err(|e| WardedError::KeyDerivationFailed(format!("scrypt failed: {e}")))?;
        Ok(key)
    }
}

/// A key derivation function instance, tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDerivation {
    Scrypt(Scrypt),
}

impl Default for KeyDerivation {
    fn default() -> Self {
        KeyDerivation::Scrypt(Scrypt::default())
    }
}

impl KeyDerivation {
    /// A scrypt instance with the given parameters and no salt yet.
    pub fn scrypt(params: ScryptParams) -> Self {
        KeyDerivation::Scrypt(Scrypt {
            params,
            salt: Vec::new(),
        })
    }

    /// Default instance for an algorithm.
    pub fn for_kind(kind: KeyDerivationKind) -> Self {
        match kind {
            KeyDerivationKind::Scrypt => Self::scrypt(ScryptParams::default()),
        }
    }

    pub fn kind(&self) -> KeyDerivationKind {
        match self {
            KeyDerivation::Scrypt(_) => KeyDerivationKind::Scrypt,
        }
    }

    pub fn salt(&self) -> &[u8] {
        match self {
            KeyDerivation::Scrypt(s) => &s.salt,
        }
    }

    /// Derive `len` key bytes from the master key and the stored salt.
    pub fn derive(&self, master_key: &SecureKey, len: usize) -> Result<DerivedKey> {
        match self {
            KeyDerivation::Scrypt(s) => s.derive(master_key.as_bytes(), len),
        }
    }

    /// Draw a new random salt.  Call once per encryption, before `derive`.
    pub fn refresh_salt(&mut self) -> Result<()> {
        match self {
            KeyDerivation::Scrypt(s) => s.salt = random_bytes(SCRYPT_SALT_LEN)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> KeyDerivation {
        KeyDerivation::scrypt(ScryptParams { n: 1024, r: 8, p: 1 })
    }

    #[test]
    fn derive_is_deterministic_for_fixed_salt() {
        let mut kdf = cheap();
        kdf.refresh_salt().unwrap();
        let master = SecureKey::new(b"master".to_vec());

        let a = kdf.derive(&master, 32).unwrap();
        let b = kdf.derive(&master, 32).unwrap();
        assert_eq!(*a, *b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn refresh_salt_changes_salt_and_key() {
        let mut kdf = cheap();
        kdf.refresh_salt().unwrap();
        let master = SecureKey::new(b"master".to_vec());
        let salt1 = kdf.salt().to_vec();
        let key1 = kdf.derive(&master, 32).unwrap();

        kdf.refresh_salt().unwrap();
        assert_eq!(kdf.salt().len(), SCRYPT_SALT_LEN);
        assert_ne!(salt1, kdf.salt());
        assert_ne!(*key1, *kdf.derive(&master, 32).unwrap());
    }

    #[test]
    fn different_master_keys_differ() {
        let mut kdf = cheap();
        kdf.refresh_salt().unwrap();
        let k1 = kdf.derive(&SecureKey::new(b"one".to_vec()), 32).unwrap();
        let k2 = kdf.derive(&SecureKey::new(b"two".to_vec()), 32).unwrap();
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn output_length_follows_request() {
        let kdf = cheap();
        let master = SecureKey::new(b"m".to_vec());
        assert_eq!(kdf.derive(&master, 16).unwrap().len(), 16);
        assert_eq!(kdf.derive(&master, 64).unwrap().len(), 64);
    }

    #[test]
    fn rejects_non_power_of_two_n() {
        let kdf = KeyDerivation::scrypt(ScryptParams { n: 1000, r: 8, p: 1 });
        let err = kdf.derive(&SecureKey::new(b"m".to_vec()), 32).unwrap_err();
        assert!(matches!(err, WardedError::KeyDerivationFailed(_)));
    }

    #[test]
    fn default_params_match_documented_values() {
        let p = ScryptParams::default();
        assert_eq!((p.n, p.r, p.p), (16_384, 8, 1));
        assert_eq!(KeyDerivation::default().kind(), KeyDerivationKind::Scrypt);
    }

    #[test]
    fn kind_lookup_is_lenient_and_case_insensitive() {
        assert_eq!(KeyDerivationKind::parse("SCRYPT"), Some(KeyDerivationKind::Scrypt));
        assert_eq!(KeyDerivationKind::parse("argon2"), None);
        assert_eq!(KeyDerivationKind::from_name("argon2"), KeyDerivationKind::Scrypt);
        assert_eq!(KeyDerivationKind::from_discriminant(0), Some(KeyDerivationKind::Scrypt));
        assert_eq!(KeyDerivationKind::from_discriminant(7), None);
    }
}
