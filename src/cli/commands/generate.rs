//! `warded generate`: generate a random passphrase.
//!
//! Without a name the passphrase is just printed.  With a name it
//! replaces the first line of that secret, keeping the rest.

use crate::cli::passgen::{self, Charset};
use crate::cli::Context;
use crate::errors::{Result, WardedError};
use crate::ward::WardEvent;

/// Execute the `generate` command.
pub fn execute(ctx: &Context, length: usize, name: Option<&str>, charset: Charset) -> Result<()> {
    if length == 0 {
        return Err(WardedError::CommandFailed(
            "passphrase length must be at least 1".into(),
        ));
    }

    let passphrase = passgen::generate(length, charset);

    let Some(name) = name else {
        println!("Passphrase: {}", passphrase.as_str());
        return Ok(());
    };

    let key = ctx.master_key()?;
    let ward = ctx.ward(&key);
    let old = ward.update(name, passphrase.as_bytes())?;

    println!("Old: {}", String::from_utf8_lossy(&old));
    println!("New: {}", passphrase.as_str());

    ctx.audit(WardEvent::Generate { name, length });
    Ok(())
}
