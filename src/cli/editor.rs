//! Editing plaintext in an external editor.
//!
//! The plaintext is written to an owner-only scratch file, preferably on
//! a memory-backed filesystem, the editor is launched on it, and the
//! result is read back.  The scratch file is overwritten with zeros and
//! removed on every path out of `edit_text`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempPath;
use zeroize::Zeroizing;

use crate::errors::{Result, WardedError};
use crate::ward::format::{set_permissions, PRIVATE_FILE_MODE};

/// Overrides the scratch directory.
pub const TMPDIR_ENV: &str = "WARDED_TMPDIR";

/// Let the user edit `initial` and return what they saved.
pub fn edit_text(initial: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let (program, args) = editor_command();

    let mut tmp = tempfile::Builder::new()
        .prefix("warded-")
        .tempfile_in(scratch_dir())
        .map_err(|e| WardedError::EditorError(format!("failed to create temp file: {e}")))?;
    set_permissions(tmp.path(), PRIVATE_FILE_MODE)?;
    tmp.write_all(initial)?;
    tmp.flush()?;
    let scratch = ScratchFile(tmp.into_temp_path());

    let status = Command::new(&program)
        .args(&args)
        .arg(scratch.path())
        .status()
        .map_err(|e| WardedError::EditorError(format!("failed to launch '{program}': {e}")))?;

    if !status.success() {
        return Err(WardedError::EditorError(format!(
            "editor exited with code {}",
            status.code().unwrap_or(-1)
        )));
    }

    let edited = fs::read(scratch.path())
        .map_err(|e| WardedError::EditorError(format!("failed to read edited file: {e}")))?;
    Ok(Zeroizing::new(edited))
}

/// `$VISUAL`, then `$EDITOR`, then `vi`, split on whitespace into a
/// program and its leading arguments.
fn editor_command() -> (String, Vec<String>) {
    let line = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string());
    split_command(&line)
}

fn split_command(line: &str) -> (String, Vec<String>) {
    let mut words = line.split_whitespace().map(str::to_string);
    let program = words.next().unwrap_or_else(|| "vi".to_string());
    (program, words.collect())
}

/// `WARDED_TMPDIR`, else `/dev/shm` on Linux, else the system temp dir.
fn scratch_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(TMPDIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if cfg!(target_os = "linux") {
        let shm = Path::new("/dev/shm");
        if shm.is_dir() {
            return shm.to_path_buf();
        }
    }
    std::env::temp_dir()
}

/// Scratch file that is zeroed before its `TempPath` removes it.
struct ScratchFile(TempPath);

impl ScratchFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // Editors may have replaced the file; wipe whatever is there now.
        if let Ok(metadata) = fs::metadata(self.path()) {
            let len = usize::try_from(metadata.len()).unwrap_or(0);
            if len > 0 {
                if let Ok(mut file) = fs::OpenOptions::new().write(true).open(self.path()) {
                    let _ = file.write_all(&vec![0u8; len]);
                    let _ = file.sync_all();
                }
            }
        }
    }
}
