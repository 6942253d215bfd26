//! Ingestion error types

use contracts::ContractError;
use dispatcher::DispatcherError;
use thiserror::Error;

/// Fatal errors of one ingestion connection
///
/// The display strings are what the client sees in the status frame.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The connection presented no credentials
    #[error("wslogs: no token")]
    MissingIdentity,

    /// The credentials belong to an application other than the internal one
    #[error("wslogs: invalid token app name: {app_name:?}")]
    InvalidIdentity { app_name: String },

    /// A line is not a valid log entry; the rest of the stream is ignored
    #[error("wslogs: parsing log line {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: ContractError,
    },

    /// A pipeline failure reported when the dispatcher stopped
    #[error("wslogs: error storing log: {0}")]
    Storage(#[source] DispatcherError),

    /// The stream failed before a clean end
    #[error("wslogs: waiting for log data: {0}")]
    Read(#[source] std::io::Error),

    /// The status frame could not be delivered
    #[error("failed to write status frame: {0}")]
    Write(#[source] std::io::Error),
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
