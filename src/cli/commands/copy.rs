//! `warded copy`: duplicate a stored record under a new name.

use crate::cli::{output, Context};
use crate::crypto::SecureKey;
use crate::errors::Result;
use crate::ward::WardEvent;

/// Execute the `copy` command.
pub fn execute(ctx: &Context, src: &str, dst: &str) -> Result<()> {
    // Records are copied byte for byte; nothing is decrypted.
    let no_key = SecureKey::new(Vec::new());
    ctx.ward(&no_key).copy(src, dst)?;

    ctx.audit(WardEvent::Copy { from: src, to: dst });
    output::success(&format!("Copied '{src}' to '{dst}'"));
    Ok(())
}
