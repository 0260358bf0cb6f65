//! `warded remove`: delete a passphrase.

use dialoguer::Confirm;

use crate::cli::{output, Context};
use crate::crypto::SecureKey;
use crate::errors::{Result, WardedError};
use crate::ward::WardEvent;

/// Execute the `remove` command.
pub fn execute(ctx: &Context, name: &str, force: bool) -> Result<()> {
    let no_key = SecureKey::new(Vec::new());
    let ward = ctx.ward(&no_key);

    if !ward.secret_path(name)?.is_file() {
        return Err(WardedError::CommandFailed(format!(
            "passphrase '{name}' not found in ward '{}'",
            ctx.ward_name
        )));
    }

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove passphrase '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| WardedError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    ward.remove(name)?;

    ctx.audit(WardEvent::Remove { name });
    output::success(&format!("Removed passphrase '{name}'"));
    Ok(())
}
