use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ward::WardConfig;
use crate::crypto::{CipherKind, KeyDerivation, KeyDerivationKind, ScryptParams};
use crate::errors::{Result, WardedError};

/// File name of the audit database, kept in the data root next to the
/// ward directories.
pub const AUDIT_DB_FILE: &str = "audit.db";

/// User-level configuration, loaded from `<config dir>/warded/config.toml`.
///
/// Every field has a sensible default so Warded works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding one sub-directory per ward.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// What to do when the master key cannot be pinned in memory.
    #[serde(default)]
    pub memory_lock: MemoryLockPolicy,

    /// Pin the whole process with `mlockall` at startup.
    #[serde(default)]
    pub lock_all_memory: bool,

    /// Defaults for every ward.
    #[serde(default)]
    pub ward: WardSettings,

    /// Per-ward overrides, merged over `ward`.
    #[serde(default)]
    pub wards: BTreeMap<String, WardOverride>,
}

/// How a failure to pin key memory is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryLockPolicy {
    /// Pinning failure aborts the command.
    Require,
    /// Pinning failure is reported as a warning.
    #[default]
    BestEffort,
    /// Never try to pin.
    Disabled,
}

/// Algorithm names and parameters as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardSettings {
    #[serde(default = "default_cipher")]
    pub cipher: String,

    #[serde(default)]
    pub key_derivation: KeyDerivationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationSettings {
    #[serde(rename = "type", default = "default_key_derivation")]
    pub kind: String,

    #[serde(rename = "N", alias = "n", default = "default_scrypt_n")]
    pub n: u64,

    #[serde(default = "default_scrypt_r")]
    pub r: u32,

    #[serde(default = "default_scrypt_p")]
    pub p: u32,
}

/// A per-ward override; absent fields inherit from `[ward]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardOverride {
    #[serde(default)]
    pub cipher: Option<String>,

    #[serde(default)]
    pub key_derivation: Option<KeyDerivationOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationOverride {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(rename = "N", alias = "n", default)]
    pub n: Option<u64>,

    #[serde(default)]
    pub r: Option<u32>,

    #[serde(default)]
    pub p: Option<u32>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_cipher() -> String {
    CipherKind::default().name().to_string()
}

fn default_key_derivation() -> String {
    KeyDerivationKind::default().name().to_string()
}

fn default_scrypt_n() -> u64 {
    ScryptParams::default().n
}

fn default_scrypt_r() -> u32 {
    ScryptParams::default().r
}

fn default_scrypt_p() -> u32 {
    ScryptParams::default().p
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for WardSettings {
    fn default() -> Self {
        Self {
            cipher: default_cipher(),
            key_derivation: KeyDerivationSettings::default(),
        }
    }
}

impl Default for KeyDerivationSettings {
    fn default() -> Self {
        Self {
            kind: default_key_derivation(),
            n: default_scrypt_n(),
            r: default_scrypt_r(),
            p: default_scrypt_p(),
        }
    }
}

impl WardSettings {
    /// Apply an override field by field.
    fn merged(&self, over: &WardOverride) -> WardSettings {
        let mut merged = self.clone();
        if let Some(cipher) = &over.cipher {
            merged.cipher = cipher.clone();
        }
        if let Some(kdf) = &over.key_derivation {
            if let Some(kind) = &kdf.kind {
                merged.key_derivation.kind = kind.clone();
            }
            if let Some(n) = kdf.n {
                merged.key_derivation.n = n;
            }
            if let Some(r) = kdf.r {
                merged.key_derivation.r = r;
            }
            if let Some(p) = kdf.p {
                merged.key_derivation.p = p;
            }
        }
        merged
    }

    /// Resolve names to algorithms.  Unknown names fall back to the
    /// defaults (ChaCha20-Poly1305, scrypt) instead of failing.
    pub fn resolve(&self) -> WardConfig {
        let cipher = CipherKind::from_name(&self.cipher);
        let kdf = &self.key_derivation;
        let key_derivation = match KeyDerivationKind::from_name(&kdf.kind) {
            KeyDerivationKind::Scrypt => KeyDerivation::scrypt(ScryptParams {
                n: kdf.n,
                r: kdf.r,
                p: kdf.p,
            }),
        };
        WardConfig::new(cipher, key_derivation)
    }
}

impl Settings {
    /// Name of the config file inside the `warded` config directory.
    const FILE_NAME: &'static str = "config.toml";

    /// Application directory name under the XDG base directories.
    const APP_DIR: &'static str = "warded";

    /// Default config file location (`$XDG_CONFIG_HOME/warded/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join(Self::APP_DIR).join(Self::FILE_NAME))
    }

    /// Load settings from `path`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            WardedError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;

        Ok(settings)
    }

    /// The configuration for ward `name`: its override merged over the
    /// defaults, or just the defaults when it has none.
    pub fn config_for(&self, name: &str) -> WardConfig {
        match self.wards.get(name) {
            Some(over) => self.ward.merged(over).resolve(),
            None => self.ward.resolve(),
        }
    }

    /// Directory holding the wards.
    ///
    /// `override_dir` (from `--data-dir`) wins over `data_dir` in the
    /// file, which wins over `$XDG_DATA_HOME/warded`.
    pub fn data_root(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.data_dir().join(Self::APP_DIR))
            .ok_or_else(|| {
                WardedError::ConfigError("cannot determine the user data directory".into())
            })
    }
}

// ── Tests ────────────────────────────────────────────────────────────
