//! `warded check`: test the master key against the ward.

use crate::cli::{output, Context};
use crate::errors::Result;

/// Execute the `check` command.
pub fn execute(ctx: &Context) -> Result<()> {
    let key = ctx.master_key()?;
    ctx.ward(&key).check_key()?;

    output::success(&format!("Master key matches ward '{}'", ctx.ward_name));
    Ok(())
}
