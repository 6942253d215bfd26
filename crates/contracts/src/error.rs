//! Layered error definitions
//!
//! Categorized by source: config / storage / pubsub / codec

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Storage Errors =====
    /// Log collection could not be opened
    #[error("storage for app '{app_name}' unavailable: {message}")]
    StorageUnavailable { app_name: String, message: String },

    /// Bulk insert rejected by the store
    #[error("storage write for app '{app_name}' failed: {message}")]
    StorageWrite { app_name: String, message: String },

    // ===== Pub/Sub Errors =====
    /// Publish failed
    #[error("publish to topic '{topic}' failed: {message}")]
    Publish { topic: String, message: String },

    /// Subscription error (including unsubscribing twice)
    #[error("subscription to topic '{topic}' failed: {message}")]
    Subscription { topic: String, message: String },

    // ===== Codec Errors =====
    /// Log entry (de)serialization error
    #[error("log entry codec error: {0}")]
    Codec(#[from] serde_json::Error),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create storage unavailable error
    pub fn storage_unavailable(app_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            app_name: app_name.into(),
            message: message.into(),
        }
    }

    /// Create storage write error
    pub fn storage_write(app_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageWrite {
            app_name: app_name.into(),
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create subscription error
    pub fn subscription(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscription {
            topic: topic.into(),
            message: message.into(),
        }
    }
}
