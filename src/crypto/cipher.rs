//! Authenticated encryption of one record's plaintext.
//!
//! A `Cipher` holds the algorithm tag, the nonce and the ciphertext
//! (with its Poly1305 tag).  Keys are never stored: `seal` and `open`
//! ask a key-derivation callback for a key of the length the algorithm
//! needs, so the record's KDF re-derives it on every use.
//!
//! Supported algorithms:
//! - ChaCha20-Poly1305 (RFC 8439 AEAD, 12-byte nonce)
//! - XSalsa20-Poly1305 (NaCl secretbox, 24-byte nonce)

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use crypto_secretbox::XSalsa20Poly1305;
use zeroize::Zeroizing;

use crate::crypto::key::DerivedKey;
use crate::crypto::random::fill_random;
use crate::errors::{Result, WardedError};

/// Key length shared by both algorithms (256 bits).
pub const KEY_LEN: usize = 32;

/// ChaCha20-Poly1305 nonce length.
pub const CHACHA20POLY1305_NONCE_LEN: usize = 12;

/// XSalsa20-Poly1305 nonce length.
pub const XSALSA20POLY1305_NONCE_LEN: usize = 24;

/// Algorithms a record can name in its `cipher.type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherKind {
    #[default]
    ChaCha20Poly1305,
    XSalsa20Poly1305,
}

impl CipherKind {
    pub const ALL: [CipherKind; 2] = [CipherKind::ChaCha20Poly1305, CipherKind::XSalsa20Poly1305];

    /// Canonical lowercase name written to disk and accepted in config.
    pub fn name(self) -> &'static str {
        match self {
            CipherKind::ChaCha20Poly1305 => "chacha20poly1305",
            CipherKind::XSalsa20Poly1305 => "xsalsa20poly1305",
        }
    }

    /// Strict, case-insensitive lookup.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "chacha20poly1305" => Some(CipherKind::ChaCha20Poly1305),
            "xsalsa20poly1305" => Some(CipherKind::XSalsa20Poly1305),
            _ => None,
        }
    }

    /// Lenient lookup: any unrecognized name falls through to ChaCha20-Poly1305.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// Historical numeric discriminant (`0` = ChaCha20-Poly1305, `1` = XSalsa20-Poly1305).
    pub fn from_discriminant(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(CipherKind::ChaCha20Poly1305),
            1 => Some(CipherKind::XSalsa20Poly1305),
            _ => None,
        }
    }

    pub fn key_len(self) -> usize {
        KEY_LEN
    }

    pub fn nonce_len(self) -> usize {
        match self {
            CipherKind::ChaCha20Poly1305 => CHACHA20POLY1305_NONCE_LEN,
            CipherKind::XSalsa20Poly1305 => XSALSA20POLY1305_NONCE_LEN,
        }
    }
}

/// Sealed data for one record, tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cipher {
    ChaCha20Poly1305 {
        nonce: [u8; CHACHA20POLY1305_NONCE_LEN],
        ciphertext: Vec<u8>,
    },
    XSalsa20Poly1305 {
        nonce: [u8; XSALSA20POLY1305_NONCE_LEN],
        ciphertext: Vec<u8>,
    },
}

impl Cipher {
    /// An empty instance of `kind`, ready for `seal`.
    pub fn new(kind: CipherKind) -> Self {
        match kind {
            CipherKind::ChaCha20Poly1305 => Cipher::ChaCha20Poly1305 {
                nonce: [0u8; CHACHA20POLY1305_NONCE_LEN],
                ciphertext: Vec::new(),
            },
            CipherKind::XSalsa20Poly1305 => Cipher::XSalsa20Poly1305 {
                nonce: [0u8; XSALSA20POLY1305_NONCE_LEN],
                ciphertext: Vec::new(),
            },
        }
    }

    /// Rebuild a stored instance, checking the nonce length for `kind`.
    pub fn from_parts(kind: CipherKind, nonce: &[u8], ciphertext: Vec<u8>) -> Option<Self> {
        match kind {
            CipherKind::ChaCha20Poly1305 => Some(Cipher::ChaCha20Poly1305 {
                nonce: nonce.try_into().ok()?,
                ciphertext,
            }),
            CipherKind::XSalsa20Poly1305 => Some(Cipher::XSalsa20Poly1305 {
                nonce: nonce.try_into().ok()?,
                ciphertext,
            }),
        }
    }

    pub fn kind(&self) -> CipherKind {
        match self {
            Cipher::ChaCha20Poly1305 { .. } => CipherKind::ChaCha20Poly1305,
            Cipher::XSalsa20Poly1305 { .. } => CipherKind::XSalsa20Poly1305,
        }
    }

    pub fn nonce(&self) -> &[u8] {
        match self {
            Cipher::ChaCha20Poly1305 { nonce, .. } => nonce,
            Cipher::XSalsa20Poly1305 { nonce, .. } => nonce,
        }
    }

    pub fn ciphertext(&self) -> &[u8] {
        match self {
            Cipher::ChaCha20Poly1305 { ciphertext, .. } => ciphertext,
            Cipher::XSalsa20Poly1305 { ciphertext, .. } => ciphertext,
        }
    }

    /// Encrypt `plaintext` under a freshly requested key and a fresh nonce.
    pub fn seal<F>(&mut self, plaintext: &[u8], derive_key: F) -> Result<()>
    where
        F: FnOnce(usize) -> Result<DerivedKey>,
    {
        let key = derive_key(self.kind().key_len())?;

        match self {
            Cipher::ChaCha20Poly1305 { nonce, ciphertext } => {
                let aead = ChaCha20Poly1305::new_from_slice(&key).map_err(|e| {
                    WardedError::EncryptionFailed(format!("invalid key length: {e}"))
                })?;
                fill_random(&mut nonce[..])?;
                *ciphertext = aead
                    .encrypt(chacha20poly1305::Nonce::from_slice(&nonce[..]), plaintext)
                    .map_err(|e| WardedError::EncryptionFailed(format!("encryption error: {e}")))?;
            }
            Cipher::XSalsa20Poly1305 { nonce, ciphertext } => {
                let secretbox = XSalsa20Poly1305::new_from_slice(&key).map_err(|e| {
                    WardedError::EncryptionFailed(format!("invalid key length: {e}"))
                })?;
                fill_random(&mut nonce[..])?;
                *ciphertext = secretbox
                    .encrypt(crypto_secretbox::Nonce::from_slice(&nonce[..]), plaintext)
                    .map_err(|e| WardedError::EncryptionFailed(format!("encryption error: {e}")))?;
            }
        }

        Ok(())
    }

    /// Re-derive the key and decrypt with the stored nonce.
    ///
    /// Any verification failure is `AuthenticationFailure`; wrong key and
    /// tampered data are deliberately indistinguishable.
    pub fn open<F>(&self, derive_key: F) -> Result<Zeroizing<Vec<u8>>>
    where
        F: FnOnce(usize) -> Result<DerivedKey>,
    {
        let key = derive_key(self.kind().key_len())?;

        let plaintext = match self {
            Cipher::ChaCha20Poly1305 { nonce, ciphertext } => {
                let aead = ChaCha20Poly1305::new_from_slice(&key)
                    .map_err(|_| WardedError::AuthenticationFailure)?;
                aead.decrypt(chacha20poly1305::Nonce::from_slice(&nonce[..]), ciphertext.as_slice())
            }
            Cipher::XSalsa20Poly1305 { nonce, ciphertext } => {
                let secretbox = XSalsa20Poly1305::new_from_slice(&key)
                    .map_err(|_| WardedError::AuthenticationFailure)?;
                secretbox.decrypt(crypto_secretbox::Nonce::from_slice(&nonce[..]), ciphertext.as_slice())
            }
        };

        plaintext
            .map(Zeroizing::new)
            .map_err(|_| WardedError::AuthenticationFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_key(byte: u8) -> impl FnOnce(usize) -> Result<DerivedKey> {
        move |len| Ok(Zeroizing::new(vec![byte; len]))
    }

    #[test]
    fn roundtrip_every_kind() {
        for kind in CipherKind::ALL {
            let mut cipher = Cipher::new(kind);
            cipher.seal(b"hunter2\nuser@example.com", fixed_key(0x11)).unwrap();
            assert_eq!(cipher.nonce().len(), kind.nonce_len());

            let plain = cipher.open(fixed_key(0x11)).unwrap();
            assert_eq!(plain.as_slice(), b"hunter2\nuser@example.com");
        }
    }

    #[test]
    fn requests_algorithm_key_length() {
        for kind in CipherKind::ALL {
            let mut cipher = Cipher::new(kind);
            cipher
                .seal(b"x", |len| {
                    assert_eq!(len, KEY_LEN);
                    Ok(Zeroizing::new(vec![1u8; len]))
                })
                .unwrap();
        }
    }

    #[test]
    fn wrong_key_is_authentication_failure() {
        for kind in CipherKind::ALL {
            let mut cipher = Cipher::new(kind);
            cipher.seal(b"secret", fixed_key(0x01)).unwrap();
            let err = cipher.open(fixed_key(0x02)).unwrap_err();
            assert!(matches!(err, WardedError::AuthenticationFailure));
        }
    }

    #[test]
    fn sealing_twice_uses_fresh_nonces() {
        let mut a = Cipher::new(CipherKind::ChaCha20Poly1305);
        let mut b = Cipher::new(CipherKind::ChaCha20Poly1305);
        a.seal(b"same", fixed_key(0x33)).unwrap();
        b.seal(b"same", fixed_key(0x33)).unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn key_derivation_errors_propagate() {
        let mut cipher = Cipher::new(CipherKind::XSalsa20Poly1305);
        let err = cipher
            .seal(b"x", |_| Err(WardedError::KeyDerivationFailed("boom".into())))
            .unwrap_err();
        assert!(matches!(err, WardedError::KeyDerivationFailed(_)));
    }

    #[test]
    fn from_parts_checks_nonce_length() {
        assert!(Cipher::from_parts(CipherKind::ChaCha20Poly1305, &[0u8; 12], vec![]).is_some());
        assert!(Cipher::from_parts(CipherKind::ChaCha20Poly1305, &[0u8; 24], vec![]).is_none());
        assert!(Cipher::from_parts(CipherKind::XSalsa20Poly1305, &[0u8; 24], vec![]).is_some());
        assert!(Cipher::from_parts(CipherKind::XSalsa20Poly1305, &[0u8; 8], vec![]).is_none());
    }

    #[test]
    fn names_resolve_leniently() {
        assert_eq!(CipherKind::from_name("XSalsa20Poly1305"), CipherKind::XSalsa20Poly1305);
        assert_eq!(CipherKind::from_name("ChaCha20Poly1305"), CipherKind::ChaCha20Poly1305);
        assert_eq!(CipherKind::from_name("aes-gcm"), CipherKind::ChaCha20Poly1305);
        assert_eq!(CipherKind::from_name(""), CipherKind::ChaCha20Poly1305);
        assert_eq!(CipherKind::from_discriminant(1), Some(CipherKind::XSalsa20Poly1305));
        assert_eq!(CipherKind::from_discriminant(2), None);
    }
}
