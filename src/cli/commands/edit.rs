//! `warded edit`: open a passphrase in an editor.
//!
//! Decrypts the passphrase to a scratch file, launches `$VISUAL` /
//! `$EDITOR` / `vi`, and seals the result as a new record on save.  A
//! passphrase that does not exist yet starts out empty, once the master
//! key has been checked against the rest of the ward.

use crate::cli::{editor, output, Context};
use crate::errors::Result;
use crate::ward::WardEvent;

/// Execute the `edit` command.
pub fn execute(ctx: &Context, name: &str) -> Result<()> {
    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);

    let current = ward.get_or_check(name)?;
    let edited = editor::edit_text(&current)?;
    ward.edit_if_changed(name, &current, &edited)?;

    ctx.audit(WardEvent::Edit { name });
    output::success(&format!("Modified passphrase '{name}'"));

    Ok(())
}
