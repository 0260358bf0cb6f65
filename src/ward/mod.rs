//! Wards: directories of individually encrypted secrets.
//!
//! - `event`: `WardEvent`, what a command did, for the audit log
//! - `format`: the on-disk JSON record and private-file helpers
//! - `record`: `SecretRecord`, one sealed secret and its file
//! - `store`: `Ward`, the operations over a whole directory
//! - `search`: line matching and `key: value` lookups
//! - `stats`: passphrase length and reuse statistics

pub mod event;
pub mod format;
pub mod record;
pub mod search;
pub mod stats;
pub mod store;

pub use event::WardEvent;
pub use record::{SecretRecord, SECRET_FILE_MODE};
pub use search::SearchResult;
pub use stats::{PassphraseGroup, Statistics};
pub use store::{RekeyOutcome, SecretNames, Ward};
