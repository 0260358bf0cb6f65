use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Warded.
#[derive(Debug, Error)]
pub enum WardedError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The AEAD tag did not verify: wrong key or tampered data.
    #[error("Authentication failed: wrong master key or corrupted data")]
    AuthenticationFailure,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Random source unavailable: {0}")]
    RandomSource(String),

    #[error("Memory locking failed: {0}")]
    MemoryLock(String),

    // --- Ward errors ---
    #[error("Corrupt record at {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("Only one master key is allowed per ward")]
    KeyMismatch,

    #[error("Passphrase unchanged")]
    Unchanged,

    #[error("Secret name '{0}' resolves outside the ward")]
    PathEscapesWard(String),

    #[error("Invalid secret name '{0}'")]
    InvalidSecretName(String),

    #[error("Invalid ward name: {0}")]
    InvalidWardName(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Rekey aborted, '{name}' could not be read: {source}")]
    RekeyAborted {
        name: String,
        #[source]
        source: Box<WardedError>,
    },

    #[error(
        "Rekey incomplete, re-encrypted secrets are staged at {}: {source}",
        staged.display()
    )]
    RekeyIncomplete {
        staged: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Editor error: {0}")]
    EditorError(String),

    #[error("Master key confirmation does not match")]
    KeyConfirmationMismatch,

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl WardedError {
    /// True when this is an IO error for a file or directory that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WardedError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Convenience type alias for Warded results.
pub type Result<T> = std::result::Result<T, WardedError>;
