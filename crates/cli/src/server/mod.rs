//! Server orchestration module.

mod connection;
mod orchestrator;
mod stats;

pub use connection::TailRequest;
pub use orchestrator::Server;
pub use stats::ServerStats;
