//! On-disk record format and private-file helpers.
//!
//! One record is one JSON document:
//!
//! ```text
//! {
//!   "cipher":        { "type": "chacha20poly1305", "nonce": <b64>, "ciphertext": <b64> },
//!   "keyDerivation": { "type": "scrypt", "data": { "N": 16384, "r": 8, "p": 1, "salt": <b64> } }
//! }
//! ```
//!
//! Tags are written as lowercase names.  On read a tag may also be the
//! historical numeric discriminant; an unknown or absent tag resolves to
//! the default algorithm.  Writes go to a temp file in the destination
//! directory and are renamed into place, so readers never see a
//! half-written record.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::{Cipher, CipherKind, KeyDerivation, KeyDerivationKind, Scrypt, ScryptParams};
use crate::errors::{Result, WardedError};

/// Mode for record files.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Mode for directories created inside a ward.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Prefix of in-flight temp files; never listed as secrets.
pub const TEMP_PREFIX: &str = ".warded-";

/// Suffix of in-flight temp files.
pub const TEMP_SUFFIX: &str = ".tmp";

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

/// An algorithm tag: a name or a numeric discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTag {
    Discriminant(i64),
    Name(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cipher: Option<RawCipher>,

    #[serde(
        rename = "keyDerivation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    key_derivation: Option<RawKeyDerivation>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawCipher {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<RawTag>,

    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    nonce: Option<Vec<u8>>,

    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    ciphertext: Option<Vec<u8>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawKeyDerivation {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<RawTag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<RawScryptData>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawScryptData {
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    n: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    r: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    p: Option<u32>,

    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    salt: Option<Vec<u8>>,
}

fn cipher_kind(tag: Option<&RawTag>) -> CipherKind {
    match tag {
        Some(RawTag::Name(name)) => CipherKind::from_name(name),
        Some(RawTag::Discriminant(d)) => CipherKind::from_discriminant(*d).unwrap_or_default(),
        None => CipherKind::default(),
    }
}

fn key_derivation_kind(tag: Option<&RawTag>) -> KeyDerivationKind {
    match tag {
        Some(RawTag::Name(name)) => KeyDerivationKind::from_name(name),
        Some(RawTag::Discriminant(d)) => {
            KeyDerivationKind::from_discriminant(*d).unwrap_or_default()
        }
        None => KeyDerivationKind::default(),
    }
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Serialize a record's two halves to the tagged JSON document.
pub fn encode(cipher: &Cipher, key_derivation: &KeyDerivation) -> Result<Vec<u8>> {
    let raw_kdf = match key_derivation {
        KeyDerivation::Scrypt(s) => RawKeyDerivation {
            kind: Some(RawTag::Name(KeyDerivationKind::Scrypt.name().to_string())),
            data: Some(RawScryptData {
                n: Some(s.params.n),
                r: Some(s.params.r),
                p: Some(s.params.p),
                salt: Some(s.salt.clone()),
            }),
        },
    };

    let raw = RawRecord {
        cipher: Some(RawCipher {
            kind: Some(RawTag::Name(cipher.kind().name().to_string())),
            nonce: Some(cipher.nonce().to_vec()),
            ciphertext: Some(cipher.ciphertext().to_vec()),
        }),
        key_derivation: Some(raw_kdf),
    };

    serde_json::to_vec_pretty(&raw)
        .map_err(|e| WardedError::SerializationError(format!("record: {e}")))
}

/// Parse a record document read from `path`.
///
/// Structural problems (bad JSON, missing ciphertext, nonce or salt, a
/// nonce of the wrong size) are `CorruptRecord`.
pub fn decode(path: &Path, bytes: &[u8]) -> Result<(Cipher, KeyDerivation)> {
    let corrupt = |reason: String| WardedError::CorruptRecord {
        path: path.to_path_buf(),
        reason,
    };

    let raw: RawRecord =
        serde_json::from_slice(bytes).map_err(|e| corrupt(format!("invalid JSON: {e}")))?;

    let raw_cipher = raw
        .cipher
        .ok_or_else(|| corrupt("missing cipher section".into()))?;
    let kind = cipher_kind(raw_cipher.kind.as_ref());

    let nonce = raw_cipher
        .nonce
        .ok_or_else(|| corrupt("missing nonce".into()))?;
    let ciphertext = match raw_cipher.ciphertext {
        Some(ct) if !ct.is_empty() => ct,
        _ => return Err(corrupt("missing ciphertext".into())),
    };
    let nonce_len = nonce.len();
    let cipher = Cipher::from_parts(kind, &nonce, ciphertext).ok_or_else(|| {
        corrupt(format!(
            "{} nonce must be {} bytes, found {nonce_len}",
            kind.name(),
            kind.nonce_len()
        ))
    })?;

    let raw_kdf = raw.key_derivation.unwrap_or_default();
    let key_derivation = match key_derivation_kind(raw_kdf.kind.as_ref()) {
        KeyDerivationKind::Scrypt => {
            let data = raw_kdf.data.unwrap_or_default();
            let defaults = ScryptParams::default();
            let salt = match data.salt {
                Some(salt) if !salt.is_empty() => salt,
                _ => return Err(corrupt("missing salt".into())),
            };
            KeyDerivation::Scrypt(Scrypt {
                params: ScryptParams {
                    n: data.n.unwrap_or(defaults.n),
                    r: data.r.unwrap_or(defaults.r),
                    p: data.p.unwrap_or(defaults.p),
                },
                salt,
            })
        }
    };

    Ok((cipher, key_derivation))
}

// ---------------------------------------------------------------------------
// Private files
// ---------------------------------------------------------------------------

/// True for names of in-flight temp files written by `write_private_atomic`.
pub fn is_temp_file(file_name: &str) -> bool {
    file_name.starts_with(TEMP_PREFIX) && file_name.ends_with(TEMP_SUFFIX)
}

/// Create `dir` and any missing parents with owner-only access.
pub fn create_private_dir_all(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PRIVATE_DIR_MODE);
    }
    builder.create(dir)?;
    Ok(())
}

/// Write `bytes` to `path` atomically with file mode `mode`.
///
/// The temp file lives next to the destination so the final rename
/// never crosses a filesystem.
pub fn write_private_atomic(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    create_private_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    set_permissions(tmp.path(), mode)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| WardedError::Io(e.error))?;
    Ok(())
}

/// Apply Unix permissions when supported.
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for optional base64-encoded byte fields
// ---------------------------------------------------------------------------

mod base64_opt {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| BASE64.decode(s))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
