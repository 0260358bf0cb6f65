//! `warded move`: rename a passphrase.

use crate::cli::{output, Context};
use crate::crypto::SecureKey;
use crate::errors::Result;
use crate::ward::WardEvent;

/// Execute the `move` command.
pub fn execute(ctx: &Context, src: &str, dst: &str) -> Result<()> {
    let no_key = SecureKey::new(Vec::new());
    ctx.ward(&no_key).rename(src, dst)?;

    ctx.audit(WardEvent::Move { from: src, to: dst });
    output::success(&format!("Moved '{src}' to '{dst}'"));
    Ok(())
}
