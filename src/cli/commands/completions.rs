//! `warded completions`: generate shell completion scripts.
//!
//! Usage:
//!   warded completions bash > ~/.local/share/bash-completion/completions/warded
//!   warded completions zsh
//!   warded completions fish

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{Result, WardedError};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    render(parse_shell(shell)?, &mut io::stdout())
}

/// Write the completion script for `shell` to `out`.
fn render(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "warded", out);
    Ok(())
}

/// Shell names are case-insensitive; `ps` is short for PowerShell.
fn parse_shell(name: &str) -> Result<Shell> {
    let lower = name.to_ascii_lowercase();
    let canonical = if lower == "ps" { "powershell" } else { lower.as_str() };
    canonical.parse::<Shell>().map_err(|_| {
        WardedError::CommandFailed(format!(
            "unknown shell '{name}', supported: bash, zsh, fish, powershell, elvish"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_shells() {
        assert_eq!(parse_shell("bash").unwrap(), Shell::Bash);
        assert_eq!(parse_shell("Zsh").unwrap(), Shell::Zsh);
        assert_eq!(parse_shell("FISH").unwrap(), Shell::Fish);
        assert_eq!(parse_shell("ps").unwrap(), Shell::PowerShell);
        assert_eq!(parse_shell("elvish").unwrap(), Shell::Elvish);
    }

    #[test]
    fn parse_shell_unknown_fails() {
        assert!(parse_shell("csh").is_err());
        assert!(parse_shell("").is_err());
    }

    #[test]
    fn bash_script_knows_subcommands() {
        let mut buf = Vec::new();
        render(Shell::Bash, &mut buf).unwrap();
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("warded"));
        assert!(script.contains("rekey"));
        assert!(script.contains("generate"));
    }
}
