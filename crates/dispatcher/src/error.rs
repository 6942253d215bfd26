//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The application's collection could not be opened
    #[error("failed to open log storage for app '{app_name}': {source}")]
    StorageOpen {
        app_name: String,
        #[source]
        source: ContractError,
    },

    /// A bulk insert failed; the batch was not persisted
    #[error("failed to store {count} log entries for app '{app_name}': {source}")]
    Persist {
        app_name: String,
        count: usize,
        #[source]
        source: ContractError,
    },

    /// The pipeline no longer accepts entries
    #[error("log pipeline for app '{app_name}' is closed")]
    PipelineClosed { app_name: String },

    /// A pipeline task panicked or was cancelled
    #[error("log pipeline task for app '{app_name}' failed: {message}")]
    TaskFailed { app_name: String, message: String },

    /// Several pipelines failed during shutdown
    #[error("{}", join_messages(.0))]
    Multiple(Vec<DispatcherError>),
}

impl DispatcherError {
    /// Create a pipeline closed error
    pub fn pipeline_closed(app_name: impl Into<String>) -> Self {
        Self::PipelineClosed {
            app_name: app_name.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed(app_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            app_name: app_name.into(),
            message: message.into(),
        }
    }

    /// Fold shutdown failures into a single result
    ///
    /// A lone failure is returned unchanged; two or more become `Multiple`.
    pub fn combine(mut errors: Vec<DispatcherError>) -> Result<(), DispatcherError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Application the error belongs to, if it concerns a single pipeline
    pub fn app_name(&self) -> Option<&str> {
        match self {
            Self::StorageOpen { app_name, .. }
            | Self::Persist { app_name, .. }
            | Self::PipelineClosed { app_name }
            | Self::TaskFailed { app_name, .. } => Some(app_name),
            Self::Multiple(_) => None,
        }
    }
}

fn join_messages(errors: &[DispatcherError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
