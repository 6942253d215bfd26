//! Test doubles shared by the unit tests of this crate

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use contracts::{ContractError, LogCollection, LogEntry, LogStore, PubSub, TopicSubscription};

use crate::stores::{MemoryCollection, MemoryStore};

/// Records published payloads, optionally failing every publish
#[derive(Default)]
pub(crate) struct RecordingPubSub {
    pub published: Mutex<Vec<(String, Bytes)>>,
    pub should_fail: bool,
}

impl RecordingPubSub {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn published_messages(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| LogEntry::decode(payload).unwrap().message)
            .collect()
    }
}

pub(crate) struct NoSubscription;

impl TopicSubscription for NoSubscription {
    fn topic(&self) -> &str {
        ""
    }

    async fn next_message(&mut self) -> Option<Bytes> {
        None
    }

    async fn unsubscribe(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

impl PubSub for RecordingPubSub {
    type Subscription = NoSubscription;

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), ContractError> {
        if self.should_fail {
            return Err(ContractError::publish(topic, "broker down"));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, _topic: &str) -> Result<NoSubscription, ContractError> {
        Ok(NoSubscription)
    }
}

/// MemoryStore wrapper whose failures are switched per application
#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub inner: MemoryStore,
    failing_apps: Arc<Mutex<HashSet<String>>>,
    unreachable: bool,
    insert_delay: Duration,
}

impl ScriptedStore {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn with_insert_delay(delay: Duration) -> Self {
        Self {
            insert_delay: delay,
            ..Default::default()
        }
    }

    /// Make every following bulk insert for `app_name` fail (or succeed again)
    pub fn set_failing(&self, app_name: &str, failing: bool) {
        let mut apps = self.failing_apps.lock().unwrap();
        if failing {
            apps.insert(app_name.to_string());
        } else {
            apps.remove(app_name);
        }
    }
}

pub(crate) struct ScriptedCollection {
    inner: MemoryCollection,
    failing_apps: Arc<Mutex<HashSet<String>>>,
    insert_delay: Duration,
}

impl LogStore for ScriptedStore {
    type Collection = ScriptedCollection;

    async fn open(&self, app_name: &str) -> Result<ScriptedCollection, ContractError> {
        if self.unreachable {
            return Err(ContractError::storage_unavailable(app_name, "no route to host"));
        }
        Ok(ScriptedCollection {
            inner: self.inner.open(app_name).await?,
            failing_apps: Arc::clone(&self.failing_apps),
            insert_delay: self.insert_delay,
        })
    }
}

impl LogCollection for ScriptedCollection {
    fn app_name(&self) -> &str {
        self.inner.app_name()
    }

    async fn bulk_insert(&mut self, entries: &[LogEntry]) -> Result<(), ContractError> {
        if !self.insert_delay.is_zero() {
            tokio::time::sleep(self.insert_delay).await;
        }
        let failing = self
            .failing_apps
            .lock()
            .unwrap()
            .contains(self.inner.app_name());
        if failing {
            return Err(ContractError::storage_write(
                self.inner.app_name(),
                "connection reset",
            ));
        }
        self.inner.bulk_insert(entries).await
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.inner.close().await
    }
}

/// Entries `0..count` for `app_name`, message = index
pub(crate) fn entries(app_name: &str, count: usize) -> Vec<LogEntry> {
    (0..count)
        .map(|i| LogEntry::new(app_name, "app", "u1", i.to_string()))
        .collect()
}
