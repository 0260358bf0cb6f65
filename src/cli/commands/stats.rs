//! `warded stats`: passphrase length and reuse statistics.

use crate::cli::{output, Context};
use crate::errors::{Result, WardedError};

/// Execute the `stats` command.
pub fn execute(ctx: &Context, subpath: Option<&str>, json: bool) -> Result<()> {
    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);
    let stats = ward.stats(subpath)?;

    if json {
        let rendered = serde_json::to_string(&stats)
            .map_err(|e| WardedError::SerializationError(format!("stats: {e}")))?;
        println!("{rendered}");
    } else {
        output::print_stats(&stats);
    }

    Ok(())
}
