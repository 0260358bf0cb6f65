//! Settings file and per-ward algorithm lookup.

pub mod settings;
pub mod ward;

pub use settings::{MemoryLockPolicy, Settings, AUDIT_DB_FILE};
pub use ward::WardConfig;
