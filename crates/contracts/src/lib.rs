//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Model
//! - `LogEntry` is the single value flowing from ingestion to storage and to
//!   the live topic.
//! - Durable storage and pub/sub are external collaborators, reached only
//!   through the `LogStore` / `PubSub` traits.

mod config;
mod error;
mod log_entry;
mod pubsub;
mod store;

pub use config::*;
pub use error::*;
pub use log_entry::*;
pub use pubsub::*;
pub use store::*;
