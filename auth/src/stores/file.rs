//! File-backed credential storage.

use crate::error::{Result, StorageError};
use crate::providers::CredentialStorage;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stores all keys in a single JSON object file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// original, so a failed write never leaves a truncated document behind. On
/// unix the file is readable by the owner only.
///
/// # Example
///
/// ```no_run
/// use tokenflow_auth::providers::CredentialStorage;
/// use tokenflow_auth::stores::FileStorage;
///
/// let storage = FileStorage::new("/var/lib/myapp/credentials.json");
/// storage.save("__token", "abc")?;
/// assert_eq!(storage.load("__token")?.as_deref(), Some("abc"));
/// # Ok::<(), tokenflow_auth::StorageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage backed by the file at `path` (created on first write).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let serialized = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");

        // A leftover temp file would keep its old mode; start from a fresh one.
        remove_if_exists(&tmp)?;
        let mut file = temp_options().open(&tmp)?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn delete_file(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

/// Options for a new temp file, owner read/write only from creation on unix.
fn temp_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            // An unreadable document cannot hold a usable credential either
            Err(StorageError::Serialization(_)) => return self.delete_file(),
            Err(err) => return Err(err),
        };

        if entries.remove(key).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            return self.delete_file();
        }
        self.write_entries(&entries)
    }
}
