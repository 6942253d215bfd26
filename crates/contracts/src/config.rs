//! ServerConfig - Config Loader output
//!
//! Describes the whole server: listeners, auth identities, pipeline tuning,
//! storage backend and live-tail sizing. Every section has defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener addresses
    #[serde(default)]
    pub server: ListenConfig,

    /// Producer identities
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-application pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Durable storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Live-tail sizing
    #[serde(default)]
    pub live: LiveConfig,
}

/// Listener addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Address accepting producer connections
    #[serde(default = "default_ingest_addr")]
    pub ingest_addr: String,

    /// Address accepting live-tail connections
    #[serde(default = "default_tail_addr")]
    pub tail_addr: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            ingest_addr: default_ingest_addr(),
            tail_addr: default_tail_addr(),
        }
    }
}

fn default_ingest_addr() -> String {
    "0.0.0.0:8089".to_string()
}

fn default_tail_addr() -> String {
    "0.0.0.0:8090".to_string()
}

/// Producer identities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The one internal application allowed to push logs
    #[serde(default = "default_internal_app")]
    pub internal_app: String,

    /// Token -> application name the token was issued for
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            internal_app: default_internal_app(),
            tokens: HashMap::new(),
        }
    }
}

fn default_internal_app() -> String {
    "tsr".to_string()
}

/// Per-application pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ingestion queue capacity (admission control)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Entries per bulk insert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Idle time before a partial batch is flushed
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    500
}

/// Storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// JSON-lines file per application
    #[default]
    File,
    /// In-process, lost on exit
    Memory,
}

/// Durable storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub kind: StorageKind,

    /// Base directory for the file store
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./logs")
}

/// Live-tail sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Messages buffered per topic before slow subscribers start skipping
    #[serde(default = "default_topic_capacity")]
    pub topic_capacity: usize,

    /// Entries buffered per listener
    #[serde(default = "default_delivery_capacity")]
    pub delivery_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            topic_capacity: default_topic_capacity(),
            delivery_capacity: default_delivery_capacity(),
        }
    }
}

fn default_topic_capacity() -> usize {
    1024
}

fn default_delivery_capacity() -> usize {
    10
}
