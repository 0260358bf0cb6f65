//! `warded list`: list passphrase names (no master key needed).

use crate::cli::{output, Context};
use crate::crypto::SecureKey;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(ctx: &Context, subpath: Option<&str>) -> Result<()> {
    // Listing never decrypts, so the ward gets an empty key.
    let no_key = SecureKey::new(Vec::new());
    let ward = ctx.ward(&no_key);

    let names = ward.list(subpath)?.collect::<Result<Vec<_>>>()?;
    output::print_secret_names(&ctx.ward_name, &names);

    Ok(())
}
