//! `warded grep`: search every passphrase for a regular expression.

use crate::cli::{output, Context};
use crate::errors::Result;
use crate::ward::{search, WardEvent};

/// Execute the `grep` command.
pub fn execute(ctx: &Context, pattern: &str, ignore_case: bool, path: Option<&str>) -> Result<()> {
    let regex = search::compile(pattern, ignore_case)?;

    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);
    let results = ward.search(path, &regex)?;

    if results.is_empty() {
        output::info("No matches.");
    }
    for result in &results {
        output::print_search_result(result);
    }

    ctx.audit(WardEvent::Grep { matches: results.len() });
    Ok(())
}
