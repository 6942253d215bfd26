//! MemoryStore - keeps every batch in process memory

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, LogCollection, LogEntry, LogStore};
use tracing::{debug, instrument};

type Batches = HashMap<String, Vec<Vec<LogEntry>>>;

/// Store whose collections append to a shared in-memory map
///
/// Cloning shares the same contents, which is how callers inspect what a
/// dispatcher has persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    batches: Arc<Mutex<Batches>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches inserted for `app_name`, in insertion order
    pub fn batches(&self, app_name: &str) -> Vec<Vec<LogEntry>> {
        lock(&self.batches)
            .get(app_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Every entry inserted for `app_name`, batches concatenated
    pub fn entries(&self, app_name: &str) -> Vec<LogEntry> {
        self.batches(app_name).into_iter().flatten().collect()
    }

    /// Applications that have at least one persisted batch
    pub fn app_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.batches).keys().cloned().collect();
        names.sort();
        names
    }
}

impl LogStore for MemoryStore {
    type Collection = MemoryCollection;

    #[instrument(name = "memory_store_open", skip(self))]
    async fn open(&self, app_name: &str) -> Result<MemoryCollection, ContractError> {
        Ok(MemoryCollection {
            app_name: app_name.to_string(),
            batches: Arc::clone(&self.batches),
        })
    }
}

/// Collection for one application inside a `MemoryStore`
#[derive(Debug)]
pub struct MemoryCollection {
    app_name: String,
    batches: Arc<Mutex<Batches>>,
}

impl LogCollection for MemoryCollection {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    async fn bulk_insert(&mut self, entries: &[LogEntry]) -> Result<(), ContractError> {
        lock(&self.batches)
            .entry(self.app_name.clone())
            .or_default()
            .push(entries.to_vec());
        debug!(app = %self.app_name, count = entries.len(), "Batch stored in memory");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

fn lock(batches: &Mutex<Batches>) -> MutexGuard<'_, Batches> {
    batches.lock().unwrap_or_else(PoisonError::into_inner)
}
