//! `warded rekey`: re-encrypt the whole ward under a new master key.
//!
//! Every passphrase is decrypted with the current key first; if any of
//! them fails, nothing on disk changes.  The re-encrypted ward is staged
//! next to the old one and swapped in at the end.

use crate::cli::{output, Context};
use crate::errors::{Result, WardedError};
use crate::ward::WardEvent;

/// Execute the `rekey` command.
pub fn execute(ctx: &Context) -> Result<()> {
    output::info("Enter the current master key.");
    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);

    // Fail early on a wrong key instead of after asking for the new one.
    ward.check_key()?;

    output::info("Choose the new master key.");
    let new_key = ctx.new_master_key()?;

    let outcome = match ward.rekey(&new_key, &ctx.data_root) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let WardedError::RekeyIncomplete { staged, .. } = &e {
                ctx.audit(WardEvent::RekeyIncomplete { staged });
                output::warning("The old ward was removed but the new one could not be moved into place.");
                output::tip("Move the staged directory named below to the ward path by hand.");
            }
            return Err(e);
        }
    };

    ctx.audit(WardEvent::Rekey {
        secrets: outcome.secrets,
    });
    output::success(&format!(
        "Rekeyed {} passphrases in ward '{}'",
        outcome.secrets, ctx.ward_name
    ));

    Ok(())
}
