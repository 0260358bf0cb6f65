//! A single encrypted secret and its backing file.

use std::fs;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::format;
use crate::config::WardConfig;
use crate::crypto::{Cipher, KeyDerivation, SecureKey};
use crate::errors::Result;

/// File mode every record is persisted with.
pub const SECRET_FILE_MODE: u32 = format::PRIVATE_FILE_MODE;

/// One sealed secret: its cipher instance, its key-derivation instance
/// and the file it lives in.
///
/// A record is never re-sealed in place; changing a secret means
/// creating a new record (fresh salt, fresh nonce) and persisting it
/// over the old file.
#[derive(Debug, Clone)]
pub struct SecretRecord {
    cipher: Cipher,
    key_derivation: KeyDerivation,
    path: PathBuf,
}

impl SecretRecord {
    /// Seal `plaintext` under `master_key` with the ward's algorithms.
    pub fn create(
        path: impl Into<PathBuf>,
        master_key: &SecureKey,
        plaintext: &[u8],
        config: &WardConfig,
    ) -> Result<Self> {
        let mut key_derivation = config.key_derivation.clone();
        key_derivation.refresh_salt()?;

        let mut cipher = Cipher::new(config.cipher);
        cipher.seal(plaintext, |len| key_derivation.derive(master_key, len))?;

        Ok(Self {
            cipher,
            key_derivation,
            path: path.into(),
        })
    }

    /// Load the record stored at `path` without decrypting it.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let (cipher, key_derivation) = format::decode(&path, &bytes)?;
        Ok(Self {
            cipher,
            key_derivation,
            path,
        })
    }

    /// Re-derive the record key from `master_key` and open the cipher.
    pub fn decrypt(&self, master_key: &SecureKey) -> Result<Zeroizing<Vec<u8>>> {
        self.cipher
            .open(|len| self.key_derivation.derive(master_key, len))
    }

    /// Write the record to its path with file mode `mode`, creating
    /// owner-only parent directories as needed.
    pub fn persist(&self, mode: u32) -> Result<()> {
        let bytes = format::encode(&self.cipher, &self.key_derivation)?;
        format::write_private_atomic(&self.path, &bytes, mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    pub fn key_derivation(&self) -> &KeyDerivation {
        &self.key_derivation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CipherKind, ScryptParams};
    use crate::errors::WardedError;
    use tempfile::TempDir;

    fn cheap(cipher: CipherKind) -> WardConfig {
        WardConfig::new(
            cipher,
            KeyDerivation::scrypt(ScryptParams { n: 1024, r: 8, p: 1 }),
        )
    }

    #[test]
    fn persist_then_read_decrypts() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"master".to_vec());

        for kind in CipherKind::ALL {
            let path = tmp.path().join(kind.name()).join("email");
            let record = SecretRecord::create(&path, &key, b"hunter2\nuser", &cheap(kind)).unwrap();
            record.persist(SECRET_FILE_MODE).unwrap();

            let loaded = SecretRecord::read(&path).unwrap();
            assert_eq!(loaded.cipher().kind(), kind);
            assert_eq!(loaded.decrypt(&key).unwrap().as_slice(), b"hunter2\nuser");
        }
    }

    #[test]
    fn record_keeps_its_own_parameters() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"master".to_vec());
        let path = tmp.path().join("old");

        let config = WardConfig::new(
            CipherKind::XSalsa20Poly1305,
            KeyDerivation::scrypt(ScryptParams { n: 2048, r: 4, p: 1 }),
        );
        SecretRecord::create(&path, &key, b"legacy", &config)
            .unwrap()
            .persist(SECRET_FILE_MODE)
            .unwrap();

        // The ward default moving on does not matter to existing records.
        let loaded = SecretRecord::read(&path).unwrap();
        assert_eq!(loaded.cipher().kind(), CipherKind::XSalsa20Poly1305);
        match loaded.key_derivation() {
            KeyDerivation::Scrypt(s) => assert_eq!(s.params, ScryptParams { n: 2048, r: 4, p: 1 }),
        }
        assert_eq!(loaded.decrypt(&key).unwrap().as_slice(), b"legacy");
    }

    #[test]
    fn wrong_master_key_fails_authentication() {
        let key = SecureKey::new(b"right".to_vec());
        let record =
            SecretRecord::create("unused", &key, b"x", &cheap(CipherKind::ChaCha20Poly1305)).unwrap();

        let err = record.decrypt(&SecureKey::new(b"wrong".to_vec())).unwrap_err();
        assert!(matches!(err, WardedError::AuthenticationFailure));
    }

    #[test]
    fn each_create_draws_fresh_salt_and_nonce() {
        let key = SecureKey::new(b"master".to_vec());
        let config = cheap(CipherKind::ChaCha20Poly1305);
        let a = SecretRecord::create("a", &key, b"same", &config).unwrap();
        let b = SecretRecord::create("b", &key, b"same", &config).unwrap();

        assert_ne!(a.key_derivation().salt(), b.key_derivation().salt());
        assert_ne!(a.cipher().nonce(), b.cipher().nonce());
        assert_ne!(a.cipher().ciphertext(), b.cipher().ciphertext());
    }

    #[test]
    fn missing_file_is_io_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = SecretRecord::read(tmp.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }
}
