//! Live tailing errors

use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiveError {
    /// `close` called on a listener that is already closed
    #[error("listener for app '{app_name}' already closed")]
    AlreadyClosed { app_name: String },

    #[error("failed to subscribe: {0}")]
    Subscribe(#[source] ContractError),

    #[error("failed to unsubscribe: {0}")]
    Unsubscribe(#[source] ContractError),
}
