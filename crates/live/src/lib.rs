//! # Live
//!
//! Real-time log tailing.
//!
//! - `MemoryPubSub`: in-process topic broker used when no external broker is
//!   configured
//! - `LiveListener`: per-application subscription with an optional
//!   source/unit filter and a small bounded delivery queue

pub mod error;
pub mod listener;
pub mod pubsub;

pub use error::LiveError;
pub use listener::{LiveListener, DEFAULT_DELIVERY_CAPACITY};
pub use pubsub::{MemoryPubSub, MemorySubscription, DEFAULT_TOPIC_CAPACITY};
