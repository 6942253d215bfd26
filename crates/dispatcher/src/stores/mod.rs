//! Store implementations
//!
//! Contains MemoryStore and FileStore.

mod file;
mod memory;

pub use self::file::{FileCollection, FileStore};
pub use self::memory::{MemoryCollection, MemoryStore};
