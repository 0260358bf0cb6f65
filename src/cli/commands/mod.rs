//! One module per subcommand.  Each exposes `execute`.

#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod check;
pub mod completions;
pub mod copy;
pub mod data;
pub mod edit;
pub mod generate;
pub mod grep;
pub mod list;
pub mod move_cmd;
pub mod rekey;
pub mod remove;
pub mod show;
pub mod stats;
