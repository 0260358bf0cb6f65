//! Ward events: what a command did to which passphrase.
//!
//! Events carry names, counts and paths only.  The audit log stores them
//! as an operation, a primary name, an optional second name and details.

use std::path::Path;

/// One operation against a ward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WardEvent<'a> {
    Show { name: &'a str },
    Data { name: &'a str },
    Edit { name: &'a str },
    Generate { name: &'a str, length: usize },
    Remove { name: &'a str },
    Move { from: &'a str, to: &'a str },
    Copy { from: &'a str, to: &'a str },
    Grep { matches: usize },
    Rekey { secrets: usize },
    /// The old ward is gone and the new one is still at `staged`.
    RekeyIncomplete { staged: &'a Path },
}

impl<'a> WardEvent<'a> {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Show { .. } => "show",
            Self::Data { .. } => "data",
            Self::Edit { .. } => "edit",
            Self::Generate { .. } => "generate",
            Self::Remove { .. } => "remove",
            Self::Move { .. } => "move",
            Self::Copy { .. } => "copy",
            Self::Grep { .. } => "grep",
            Self::Rekey { .. } => "rekey",
            Self::RekeyIncomplete { .. } => "rekey-incomplete",
        }
    }

    /// The passphrase the event is about, if it names one.
    pub fn secret_name(&self) -> Option<&'a str> {
        match *self {
            Self::Show { name }
            | Self::Data { name }
            | Self::Edit { name }
            | Self::Generate { name, .. }
            | Self::Remove { name } => Some(name),
            Self::Move { from, .. } | Self::Copy { from, .. } => Some(from),
            Self::Grep { .. } | Self::Rekey { .. } | Self::RekeyIncomplete { .. } => None,
        }
    }

    /// Destination of a move or copy.
    pub fn target(&self) -> Option<&'a str> {
        match *self {
            Self::Move { to, .. } | Self::Copy { to, .. } => Some(to),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::Generate { length, .. } => Some(format!("length {length}")),
            Self::Grep { matches } => Some(format!("{matches} matches")),
            Self::Rekey { secrets } => Some(format!("{secrets} passphrases")),
            Self::RekeyIncomplete { staged } => Some(format!("staged at {}", staged.display())),
            _ => None,
        }
    }
}
