//! Ward operations used by CLI commands.
//!
//! A `Ward` is a directory of records that all share one master key.
//! It borrows the key for the length of one command, so the caller's
//! `SecureKey` (and its wipe on drop) outlives every use here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rand::Rng;
use regex::Regex;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::format;
use super::record::{SecretRecord, SECRET_FILE_MODE};
use super::search::{search_text, SearchResult};
use super::stats::{first_line, Statistics};
use crate::config::WardConfig;
use crate::crypto::SecureKey;
use crate::errors::{Result, WardedError};

/// The main ward handle.
pub struct Ward<'k> {
    /// Directory holding the ward's records.
    root: PathBuf,

    /// Algorithms for newly written records.
    config: WardConfig,

    /// Master key for this command.
    master_key: &'k SecureKey,
}

/// What a successful `rekey` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RekeyOutcome {
    /// Number of records re-encrypted.
    pub secrets: usize,
}

impl<'k> Ward<'k> {
    pub fn new(root: impl Into<PathBuf>, config: WardConfig, master_key: &'k SecureKey) -> Self {
        Self {
            root: root.into(),
            config,
            master_key,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WardConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    /// Resolve `name` under the ward root.
    ///
    /// `.` segments are dropped and `..` pops one segment.  Popping past
    /// the root is `PathEscapesWard`; absolute names are taken relative
    /// to the root.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        let mut parts = Vec::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(WardedError::PathEscapesWard(name.to_string()));
                    }
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }

        let mut path = self.root.clone();
        path.extend(parts);
        Ok(path)
    }

    /// Like `path`, but the result must name a record, not the root.
    pub fn secret_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('\0') {
            return Err(WardedError::InvalidSecretName(name.to_string()));
        }
        let path = self.path(name)?;
        if path == self.root {
            return Err(WardedError::InvalidSecretName(name.to_string()));
        }
        Ok(path)
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Lazily walk `subpath` (default: the whole ward) and yield the
    /// relative name of every record.  Directories are not listed.
    ///
    /// Symbolic links inside the ward are skipped, never followed.
    pub fn list(&self, subpath: Option<&str>) -> Result<SecretNames> {
        let start = match subpath {
            Some(sub) => {
                let start = self.path(sub)?;
                if start != self.root && is_symlink(&start) {
                    return Ok(SecretNames::empty(self.root.clone()));
                }
                start
            }
            None => {
                if !self.root.exists() {
                    return Ok(SecretNames::empty(self.root.clone()));
                }
                self.root.clone()
            }
        };
        Ok(SecretNames::new(self.root.clone(), start))
    }

    /// Load (but do not decrypt) every record under `subpath`.
    pub fn map(&self, subpath: Option<&str>) -> Result<BTreeMap<String, SecretRecord>> {
        let mut records = BTreeMap::new();
        for name in self.list(subpath)? {
            let name = name?;
            let record = SecretRecord::read(self.path(&name)?)?;
            records.insert(name, record);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Single-secret operations
    // ------------------------------------------------------------------

    /// Read and decrypt `name`.
    pub fn get(&self, name: &str) -> Result<Zeroizing<Vec<u8>>> {
        SecretRecord::read(self.secret_path(name)?)?.decrypt(self.master_key)
    }

    /// Like `get`, but a missing secret is empty once `check_key` passes.
    ///
    /// Only "not found" falls back; corrupt records and wrong keys are
    /// reported as they are.
    pub fn get_or_check(&self, name: &str) -> Result<Zeroizing<Vec<u8>>> {
        match self.get(name) {
            Err(e) if e.is_not_found() => {
                self.check_key()?;
                Ok(Zeroizing::new(Vec::new()))
            }
            other => other,
        }
    }

    /// Seal `content` as a new record and write it over `name`.
    pub fn edit(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.secret_path(name)?;
        SecretRecord::create(path, self.master_key, content, &self.config)?
            .persist(SECRET_FILE_MODE)
    }

    /// `edit`, unless `content` equals `previous`, which is `Unchanged`.
    pub fn edit_if_changed(&self, name: &str, previous: &[u8], content: &[u8]) -> Result<()> {
        if bool::from(previous.ct_eq(content)) {
            return Err(WardedError::Unchanged);
        }
        self.edit(name, content)
    }

    /// Replace the first line of `name` with `first_line`, keeping the
    /// rest verbatim, and return the previous first line.
    ///
    /// A missing secret counts as empty, after `check_key` passes.
    pub fn update(&self, name: &str, first_line: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let current = self.get_or_check(name)?;
        let split = current
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(current.len());
        let (old, rest) = current.split_at(split);

        let mut next = Zeroizing::new(Vec::with_capacity(first_line.len() + rest.len()));
        next.extend_from_slice(first_line);
        next.extend_from_slice(rest);
        self.edit(name, &next)?;

        Ok(Zeroizing::new(old.to_vec()))
    }

    /// Copy the stored record byte for byte.
    pub fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let from = self.secret_path(src)?;
        let to = self.secret_path(dst)?;
        let bytes = fs::read(&from)?;
        format::write_private_atomic(&to, &bytes, SECRET_FILE_MODE)
    }

    /// Move a record to a new name.
    pub fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let from = self.secret_path(src)?;
        let to = self.secret_path(dst)?;
        if let Some(parent) = to.parent() {
            format::create_private_dir_all(parent)?;
        }
        fs::rename(&from, &to)?;
        Ok(())
    }

    /// Delete a record.
    pub fn remove(&self, name: &str) -> Result<()> {
        fs::remove_file(self.secret_path(name)?)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ward-wide operations
    // ------------------------------------------------------------------

    /// Re-encrypt every record under `new_key`.
    ///
    /// 1. Load and decrypt everything with the current key; any failure
    ///    aborts with `RekeyAborted` before anything is written.
    /// 2. Re-encrypt into a fresh directory under `scratch_root`.
    /// 3. Remove the ward and rename the new directory into its place.
    ///
    /// Step 3 is not atomic: if the removal succeeds and the rename does
    /// not, the ward is absent and `RekeyIncomplete` names the directory
    /// holding the re-encrypted records.  `scratch_root` must be on the
    /// ward's filesystem.
    pub fn rekey(&self, new_key: &SecureKey, scratch_root: &Path) -> Result<RekeyOutcome> {
        let records = self.map(None).map_err(|source| WardedError::RekeyAborted {
            name: match &source {
                WardedError::CorruptRecord { path, .. } => relative_name(&self.root, path),
                _ => ".".to_string(),
            },
            source: Box::new(source),
        })?;

        let mut plaintexts: Vec<(String, Zeroizing<Vec<u8>>)> = Vec::with_capacity(records.len());
        for (name, record) in records {
            let plain = record
                .decrypt(self.master_key)
                .map_err(|source| WardedError::RekeyAborted {
                    name: name.clone(),
                    source: Box::new(source),
                })?;
            plaintexts.push((name, plain));
        }

        if plaintexts.is_empty() {
            return Ok(RekeyOutcome { secrets: 0 });
        }

        let prefix = format!(
            ".{}-rekey-",
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ward".into())
        );
        let staging = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(scratch_root)?;

        for (name, plain) in &plaintexts {
            let path = staging.path().join(name);
            SecretRecord::create(path, new_key, plain, &self.config)?.persist(SECRET_FILE_MODE)?;
        }

        // From here on the staged copy must survive any failure.
        let staged = staging.keep();
        fs::remove_dir_all(&self.root)
            .and_then(|()| fs::rename(&staged, &self.root))
            .map_err(|source| WardedError::RekeyIncomplete { staged, source })?;

        Ok(RekeyOutcome {
            secrets: plaintexts.len(),
        })
    }

    /// Match `pattern` against every line of every secret under `subpath`.
    pub fn search(&self, subpath: Option<&str>, pattern: &Regex) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        for name in self.list(subpath)? {
            let name = name?;
            let plain = self.get(&name)?;
            let text = Zeroizing::new(String::from_utf8_lossy(&plain).into_owned());
            results.extend(search_text(&name, &text, pattern));
        }
        Ok(results)
    }

    /// Length and reuse statistics over the first lines under `subpath`.
    pub fn stats(&self, subpath: Option<&str>) -> Result<Statistics> {
        let mut entries = Vec::new();
        for name in self.list(subpath)? {
            let name = name?;
            let plain = self.get(&name)?;
            let text = Zeroizing::new(String::from_utf8_lossy(&plain).into_owned());
            entries.push((name, Zeroizing::new(first_line(&text).to_string())));
        }
        Ok(Statistics::from_first_lines(entries))
    }

    /// Decrypt one secret picked at random from the whole ward.
    ///
    /// An empty ward passes.  An authentication failure is
    /// `KeyMismatch`: the key differs from the one the ward uses.
    pub fn check_key(&self) -> Result<()> {
        let names = self.list(None)?.collect::<Result<Vec<_>>>()?;
        if names.is_empty() {
            return Ok(());
        }

        let pick = rand::rng().random_range(0..names.len());
        match self.get(&names[pick]) {
            Ok(_) => Ok(()),
            Err(WardedError::AuthenticationFailure) => Err(WardedError::KeyMismatch),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// SecretNames
// ---------------------------------------------------------------------------

/// Lazy depth-first walk over a ward, yielding relative record names in
/// sorted order.
pub struct SecretNames {
    root: PathBuf,
    pending: Vec<PathBuf>,
}

impl SecretNames {
    fn new(root: PathBuf, start: PathBuf) -> Self {
        Self {
            root,
            pending: vec![start],
        }
    }

    fn empty(root: PathBuf) -> Self {
        Self {
            root,
            pending: Vec::new(),
        }
    }

}

/// `path` relative to `root`, with `/` separators.
fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

impl Iterator for SecretNames {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.pending.pop() {
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => return Some(Err(e.into())),
            };

            if metadata.is_dir() {
                let entries = match fs::read_dir(&path) {
                    Ok(entries) => entries,
                    Err(e) => return Some(Err(e.into())),
                };
                let mut children = Vec::new();
                for entry in entries {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => return Some(Err(e.into())),
                    };
                    // `DirEntry::file_type` does not follow links.
                    match entry.file_type() {
                        Ok(kind) if kind.is_symlink() => {}
                        Ok(_) => children.push(entry.path()),
                        Err(e) => return Some(Err(e.into())),
                    }
                }
                // Popped from the back, so push in reverse order.
                children.sort_by(|a, b| b.cmp(a));
                self.pending.extend(children);
                continue;
            }

            let is_temp = path
                .file_name()
                .map(|n| format::is_temp_file(&n.to_string_lossy()))
                .unwrap_or(false);
            if is_temp {
                continue;
            }

            return Some(Ok(relative_name(&self.root, &path)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CipherKind, KeyDerivation, ScryptParams};
    use tempfile::TempDir;

    fn cheap() -> WardConfig {
        WardConfig::new(
            CipherKind::ChaCha20Poly1305,
            KeyDerivation::scrypt(ScryptParams { n: 1024, r: 8, p: 1 }),
        )
    }

    #[test]
    fn path_normalizes_inside_root() {
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new("/wards/default", cheap(), &key);

        assert_eq!(ward.path("a/b").unwrap(), PathBuf::from("/wards/default/a/b"));
        assert_eq!(ward.path("a/../b").unwrap(), PathBuf::from("/wards/default/b"));
        assert_eq!(ward.path("./a//b/.").unwrap(), PathBuf::from("/wards/default/a/b"));
        assert_eq!(ward.path("/etc/x").unwrap(), PathBuf::from("/wards/default/etc/x"));
        assert_eq!(ward.path("").unwrap(), PathBuf::from("/wards/default"));
    }

    #[test]
    fn path_rejects_escapes() {
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new("/wards/default", cheap(), &key);

        for name in ["..", "../other/x", "a/../../x", "a/b/../../../../etc/passwd"] {
            assert!(
                matches!(ward.path(name), Err(WardedError::PathEscapesWard(_))),
                "{name} should escape"
            );
        }
    }

    #[test]
    fn secret_path_rejects_root_and_bad_names() {
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new("/wards/default", cheap(), &key);

        for name in ["", ".", "a/..", "nul\0byte"] {
            assert!(
                matches!(ward.secret_path(name), Err(WardedError::InvalidSecretName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn list_walks_sorted_and_skips_temp_files() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);

        for name in ["web/b", "web/a", "bank", "web/deep/c"] {
            ward.edit(name, b"x").unwrap();
        }
        fs::write(tmp.path().join("w/web/.warded-abc.tmp"), b"partial").unwrap();

        let all: Vec<String> = ward.list(None).unwrap().map(|n| n.unwrap()).collect();
        assert_eq!(all, vec!["bank", "web/a", "web/b", "web/deep/c"]);

        let sub: Vec<String> = ward.list(Some("web/deep")).unwrap().map(|n| n.unwrap()).collect();
        assert_eq!(sub, vec!["web/deep/c"]);
    }

    #[test]
    fn list_of_missing_ward_is_empty() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("absent"), cheap(), &key);

        assert_eq!(ward.list(None).unwrap().count(), 0);
        let err = ward.list(Some("sub")).unwrap().next().unwrap().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_replaces_only_the_first_line() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);

        ward.edit("site", b"old-pass\nuser: me\nnotes").unwrap();
        let old = ward.update("site", b"new-pass").unwrap();

        assert_eq!(old.as_slice(), b"old-pass");
        assert_eq!(ward.get("site").unwrap().as_slice(), b"new-pass\nuser: me\nnotes");
    }

    #[test]
    fn update_creates_missing_secret() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);

        let old = ward.update("fresh", b"generated").unwrap();
        assert!(old.is_empty());
        assert_eq!(ward.get("fresh").unwrap().as_slice(), b"generated");
    }

    #[test]
    fn edit_if_changed_rejects_identical_content() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);

        let err = ward.edit_if_changed("s", b"same", b"same").unwrap_err();
        assert!(matches!(err, WardedError::Unchanged));
        assert!(!ward.secret_path("s").unwrap().exists());

        ward.edit_if_changed("s", b"same", b"different").unwrap();
        assert_eq!(ward.get("s").unwrap().as_slice(), b"different");
    }

    #[test]
    fn copy_rename_remove() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);
        ward.edit("a", b"secret").unwrap();

        ward.copy("a", "dir/b").unwrap();
        assert_eq!(
            fs::read(ward.secret_path("a").unwrap()).unwrap(),
            fs::read(ward.secret_path("dir/b").unwrap()).unwrap()
        );

        ward.rename("dir/b", "c").unwrap();
        assert_eq!(ward.get("c").unwrap().as_slice(), b"secret");
        assert!(ward.get("dir/b").unwrap_err().is_not_found());

        ward.remove("c").unwrap();
        let names: Vec<String> = ward.list(None).unwrap().map(|n| n.unwrap()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn get_or_check_distinguishes_missing_from_wrong_key() {
        let tmp = TempDir::new().unwrap();
        let right = SecureKey::new(b"right".to_vec());
        let wrong = SecureKey::new(b"wrong".to_vec());
        Ward::new(tmp.path().join("w"), cheap(), &right)
            .edit("only", b"x")
            .unwrap();

        let ward = Ward::new(tmp.path().join("w"), cheap(), &wrong);
        assert!(matches!(
            ward.get_or_check("missing"),
            Err(WardedError::KeyMismatch)
        ));
        assert!(matches!(
            ward.get_or_check("only"),
            Err(WardedError::AuthenticationFailure)
        ));
    }

    #[test]
    fn map_loads_records_without_decrypting() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"right".to_vec());
        let writer = Ward::new(tmp.path().join("w"), cheap(), &key);
        for name in ["bank", "web/a", "web/b"] {
            writer.edit(name, name.as_bytes()).unwrap();
        }

        // A ward holding the wrong key can still map: nothing is opened.
        let other = SecureKey::new(b"wrong".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &other);
        let all = ward.map(None).unwrap();
        assert_eq!(
            all.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["bank", "web/a", "web/b"]
        );
        assert_eq!(all["web/a"].path(), tmp.path().join("w/web/a"));
        assert_eq!(all["web/a"].decrypt(&key).unwrap().as_slice(), b"web/a");

        let web = ward.map(Some("web")).unwrap();
        assert_eq!(
            web.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["web/a", "web/b"]
        );
    }

    #[test]
    fn map_reports_corrupt_records() {
        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);
        ward.edit("good", b"x").unwrap();
        fs::write(tmp.path().join("w/bad"), b"not json").unwrap();

        match ward.map(None) {
            Err(WardedError::CorruptRecord { path, .. }) => {
                assert_eq!(path, tmp.path().join("w/bad"));
            }
            other => panic!("expected CorruptRecord, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn list_skips_symlinks_and_survives_loops() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let key = SecureKey::new(b"k".to_vec());
        let ward = Ward::new(tmp.path().join("w"), cheap(), &key);
        let outside = Ward::new(tmp.path().join("outside"), cheap(), &key);
        ward.edit("a", b"x").unwrap();
        outside.edit("foreign", b"y").unwrap();

        symlink(tmp.path().join("outside"), tmp.path().join("w/ext")).unwrap();
        symlink(tmp.path().join("outside/foreign"), tmp.path().join("w/linked")).unwrap();
        symlink(tmp.path().join("w"), tmp.path().join("w/loop")).unwrap();

        let names: Vec<String> = ward.list(None).unwrap().map(|n| n.unwrap()).collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(ward.list(Some("ext")).unwrap().count(), 0);
        assert!(ward.check_key().is_ok());
        assert_eq!(ward.map(None).unwrap().len(), 1);
    }
}
