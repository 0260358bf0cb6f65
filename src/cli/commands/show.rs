//! `warded show`: decrypt and print a passphrase.

use std::io::Write;

use crate::cli::Context;
use crate::errors::Result;
use crate::ward::WardEvent;

/// Execute the `show` command.
pub fn execute(ctx: &Context, name: &str, first_only: bool) -> Result<()> {
    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);

    let plain = ward.get(name)?;
    let shown = if first_only {
        let end = plain.iter().position(|&b| b == b'\n').unwrap_or(plain.len());
        &plain[..end]
    } else {
        &plain[..]
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(shown)?;
    if !shown.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;

    ctx.audit(WardEvent::Show { name });
    Ok(())
}
