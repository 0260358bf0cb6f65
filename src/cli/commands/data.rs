//! `warded data`: print `key: value` style fields of a passphrase.
//!
//! Lines whose start matches the pattern (case-insensitive) are printed
//! without the matched prefix, e.g. `warded data email user:`.

use crate::cli::Context;
use crate::errors::Result;
use crate::ward::{search, WardEvent};

use zeroize::Zeroizing;

/// Execute the `data` command.
pub fn execute(ctx: &Context, name: &str, pattern: &str, max: usize) -> Result<()> {
    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);

    let plain = ward.get(name)?;
    let text = Zeroizing::new(String::from_utf8_lossy(&plain).into_owned());
    for value in search::field_values(&text, pattern, max)? {
        println!("{value}");
    }

    ctx.audit(WardEvent::Data { name });
    Ok(())
}
