//! Mock credential storage for testing.

use crate::error::{Result, StorageError};
use crate::providers::CredentialStorage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
    saves: usize,
    removes: usize,
}

/// In-memory storage.
///
/// Clones share the same entries, so a test can keep a handle while the
/// credential store owns another. Reads and writes can be made to fail to
/// simulate an unavailable or full medium.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage holding one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.lock().entries.insert(key.to_string(), value.to_string());
        storage
    }

    /// Make every `load` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make every `save` and `remove` fail (quota exceeded).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Value currently stored under `key` (for testing).
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    /// Number of `save` calls, successful or not.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Number of `remove` calls, successful or not.
    #[must_use]
    pub fn remove_count(&self) -> usize {
        self.lock().removes
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let state = self.lock();
        if state.fail_reads {
            return Err(StorageError::Unavailable("reads disabled".to_string()));
        }
        Ok(state.entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state.saves += 1;
        if state.fail_writes {
            return Err(StorageError::QuotaExceeded { key: key.to_string() });
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        state.removes += 1;
        if state.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        state.entries.remove(key);
        Ok(())
    }
}
