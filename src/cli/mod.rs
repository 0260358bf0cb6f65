//! CLI module: Clap argument parser, command context, output helpers,
//! the editor and generator collaborators, and command implementations.

pub mod commands;
pub mod editor;
pub mod output;
pub mod passgen;

use std::path::PathBuf;

use clap::Parser;
use subtle::ConstantTimeEq;

use crate::config::{MemoryLockPolicy, Settings, WardConfig, AUDIT_DB_FILE};
use crate::crypto::{lock_all_memory, SecureKey};
use crate::errors::{Result, WardedError};
use crate::ward::{Ward, WardEvent};

use passgen::Charset;

/// Environment variable holding the master key (scripted use).
pub const MASTER_KEY_ENV: &str = "WARDED_MASTER_KEY";

/// Environment variable holding the new master key for `rekey`.
pub const NEW_MASTER_KEY_ENV: &str = "WARDED_NEW_MASTER_KEY";

/// Maximum length of a ward name.
const MAX_WARD_NAME_LEN: usize = 64;

/// Warded CLI: a minimal passphrase manager.
#[derive(Parser)]
#[command(
    name = "warded",
    about = "A minimal passphrase manager using ChaCha20-Poly1305",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Ward group name
    #[arg(
        short,
        long,
        env = "WARDED_NAME",
        default_value = "default",
        global = true
    )]
    pub ward: String,

    /// Directory holding the wards (default: <XDG data>/warded)
    #[arg(long, env = "WARDED_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Settings file (default: <XDG config>/warded/config.toml)
    #[arg(long, env = "WARDED_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show a passphrase
    Show {
        /// Show only the first line
        #[arg(short = '1', long)]
        first: bool,
        /// Passphrase name
        name: String,
    },

    /// Edit a passphrase in $VISUAL / $EDITOR
    Edit {
        /// Passphrase name
        name: String,
    },

    /// Generate a passphrase, replacing the first line of NAME if given
    Generate {
        /// Passphrase length
        length: usize,
        /// Passphrase name (prints the passphrase if omitted)
        name: Option<String>,
        /// Characters to draw from
        #[arg(short, long, value_enum, default_value_t = Charset::Ascii)]
        charset: Charset,
    },

    /// Search for text in the ward
    Grep {
        /// Ignore case when matching
        #[arg(short = 'i', long = "icase")]
        ignore_case: bool,
        /// Search term (regular expression)
        pattern: String,
        /// Only search below this path
        #[arg(long)]
        path: Option<String>,
    },

    /// List passphrases
    #[command(alias = "ls")]
    List {
        /// Only list below this path
        subpath: Option<String>,
    },

    /// Copy a passphrase
    #[command(alias = "cp")]
    Copy {
        /// Source passphrase name
        src: String,
        /// Destination passphrase name
        dst: String,
    },

    /// Move a passphrase
    #[command(alias = "mv")]
    Move {
        /// Source passphrase name
        src: String,
        /// Destination passphrase name
        dst: String,
    },

    /// Remove a passphrase
    #[command(alias = "rm")]
    Remove {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
        /// Passphrase name
        name: String,
    },

    /// Re-encrypt every passphrase in the ward under a new master key
    Rekey,

    /// Passphrase length and reuse statistics
    Stats {
        /// Print the unprocessed statistics as JSON
        #[arg(long)]
        json: bool,
        /// Only include passphrases below this path
        subpath: Option<String>,
    },

    /// Show the remainder of lines starting with a given regexp
    Data {
        /// Match at most MAX line(s), 0 for all
        #[arg(short = 'n', long, default_value_t = 0)]
        max: usize,
        /// Passphrase name
        name: String,
        /// Pattern matched against the start of each line
        pattern: String,
    },

    /// Check the master key against a random passphrase in the ward
    Check,

    /// View the audit log of the current ward
    #[cfg(feature = "audit-log")]
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
        /// Only events touching this passphrase or folder
        #[arg(long)]
        name: Option<String>,
        /// Show events from every ward, not just the current one
        #[arg(long)]
        all_wards: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Command context
// ---------------------------------------------------------------------------

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub settings: Settings,
    pub data_root: PathBuf,
    pub ward_name: String,
    pub ward_config: WardConfig,
}

impl Context {
    /// Resolve settings, data root and ward configuration from the CLI.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        validate_ward_name(&cli.ward)?;

        let settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None => match Settings::default_path() {
                Some(path) => Settings::load(&path)?,
                None => Settings::default(),
            },
        };

        if settings.lock_all_memory {
            apply_policy(settings.memory_lock, lock_all_memory())?;
        }

        let data_root = settings.data_root(cli.data_dir.as_deref())?;
        let ward_config = settings.config_for(&cli.ward);

        Ok(Self {
            settings,
            data_root,
            ward_name: cli.ward.clone(),
            ward_config,
        })
    }

    /// Directory of the selected ward.
    pub fn ward_dir(&self) -> PathBuf {
        self.data_root.join(&self.ward_name)
    }

    /// The selected ward, operating under `master_key`.
    pub fn ward<'k>(&self, master_key: &'k SecureKey) -> Ward<'k> {
        Ward::new(self.ward_dir(), self.ward_config.clone(), master_key)
    }

    /// Get the master key, trying in order:
    /// 1. `WARDED_MASTER_KEY` env var (scripts, tests)
    /// 2. Interactive hidden prompt
    ///
    /// The key is pinned according to `memory_lock`.
    pub fn master_key(&self) -> Result<SecureKey> {
        let key = match non_empty_env(MASTER_KEY_ENV) {
            Some(key) => key,
            None => dialoguer::Password::new()
                .with_prompt("Master key")
                .interact()
                .map_err(|e| WardedError::CommandFailed(format!("master key prompt: {e}")))?,
        };
        self.pinned(SecureKey::from_string(key))
    }

    /// Get a new master key (used by `rekey`), with confirmation when
    /// prompting.  Also respects `WARDED_NEW_MASTER_KEY`.
    pub fn new_master_key(&self) -> Result<SecureKey> {
        if let Some(key) = non_empty_env(NEW_MASTER_KEY_ENV) {
            return self.pinned(SecureKey::from_string(key));
        }

        let first = SecureKey::from_string(
            dialoguer::Password::new()
                .with_prompt("New master key")
                .interact()
                .map_err(|e| WardedError::CommandFailed(format!("master key prompt: {e}")))?,
        );
        let second = SecureKey::from_string(
            dialoguer::Password::new()
                .with_prompt("Confirm new master key")
                .interact()
                .map_err(|e| WardedError::CommandFailed(format!("master key prompt: {e}")))?,
        );

        if !bool::from(first.as_bytes().ct_eq(second.as_bytes())) {
            return Err(WardedError::KeyConfirmationMismatch);
        }
        self.pinned(first)
    }

    fn pinned(&self, mut key: SecureKey) -> Result<SecureKey> {
        if self.settings.memory_lock != MemoryLockPolicy::Disabled {
            apply_policy(self.settings.memory_lock, key.lock())?;
        }
        Ok(key)
    }

    /// Record an operation in the audit log.  Never fails.
    pub fn audit(&self, event: WardEvent<'_>) {
        #[cfg(feature = "audit-log")]
        crate::audit::log_event(&self.data_root, &self.ward_name, &event);

        #[cfg(not(feature = "audit-log"))]
        let _ = event;
    }
}

/// Turn a pinning result into an error or a warning per `policy`.
fn apply_policy(policy: MemoryLockPolicy, result: Result<()>) -> Result<()> {
    match (policy, result) {
        (_, Ok(())) | (MemoryLockPolicy::Disabled, Err(_)) => Ok(()),
        (MemoryLockPolicy::Require, Err(e)) => Err(e),
        (MemoryLockPolicy::BestEffort, Err(e)) => {
            output::warning(&format!("{e}; continuing without pinned memory"));
            Ok(())
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Validate that a ward name is a plain directory name.
///
/// Allowed: ASCII letters, digits, `-`, `_` and `.`, not starting with
/// `.` (so never `..` or a hidden staging directory).  Max length 64.
/// The audit database and its SQLite side files share the data root,
/// so their names are reserved.
pub fn validate_ward_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WardedError::InvalidWardName(
            "ward name cannot be empty".into(),
        ));
    }

    if name.len() > MAX_WARD_NAME_LEN {
        return Err(WardedError::InvalidWardName(format!(
            "ward name cannot exceed {MAX_WARD_NAME_LEN} characters"
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(WardedError::InvalidWardName(format!(
            "'{name}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }

    if name.starts_with('.') {
        return Err(WardedError::InvalidWardName(format!(
            "'{name}' cannot start with '.'"
        )));
    }

    if name == AUDIT_DB_FILE
        || name
            .strip_prefix(AUDIT_DB_FILE)
            .is_some_and(|rest| rest.starts_with('-'))
    {
        return Err(WardedError::InvalidWardName(format!(
            "'{name}' is reserved for the audit log"
        )));
    }

    Ok(())
}
