//! LogStore / LogCollection traits - durable storage interface
//!
//! A store hands out one collection per application; the collection is
//! owned exclusively by that application's batcher task.

use crate::{ContractError, LogEntry};

/// Durable storage collaborator
#[trait_variant::make(LogStore: Send)]
pub trait LocalLogStore {
    /// Per-application collection handle
    type Collection: LogCollection + Send + 'static;

    /// Open the collection keyed by `app_name`
    ///
    /// # Errors
    /// Returns an error when the backing store cannot be reached.
    async fn open(&self, app_name: &str) -> Result<Self::Collection, ContractError>;
}

/// Bulk-insert capable collection for one application
#[trait_variant::make(LogCollection: Send)]
pub trait LocalLogCollection {
    /// Application this collection belongs to (used for logging/metrics)
    fn app_name(&self) -> &str;

    /// Insert a batch of entries in a single call
    ///
    /// # Errors
    /// Returns write error; the batch must be considered not persisted.
    async fn bulk_insert(&mut self, entries: &[LogEntry]) -> Result<(), ContractError>;

    /// Release the collection
    async fn close(&mut self) -> Result<(), ContractError>;
}
