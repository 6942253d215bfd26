//! # Integration Tests
//!
//! Cross-crate tests of the log pipeline.
//!
//! Covers:
//! - Wire format and configuration snapshots
//! - End-to-end ingestion into file storage with live tailing
//! - Per-application failure isolation

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{log_topic, LogEntry, StorageKind};
    use dispatcher::DispatcherConfig;
    use std::time::Duration;

    #[test]
    fn test_entry_wire_format() {
        let entry = LogEntry::new("web", "app", "web-1", "GET /");
        let json: serde_json::Value = serde_json::from_slice(&entry.encode().unwrap()).unwrap();

        assert_eq!(json["AppName"], "web");
        assert_eq!(json["Source"], "app");
        assert_eq!(json["Unit"], "web-1");
        assert_eq!(json["Message"], "GET /");
        assert_eq!(log_topic("web"), "pubsub:web");
    }

    #[test]
    fn test_config_drives_dispatcher() {
        let config = ConfigLoader::load_from_str(
            r#"
            [auth]
            tokens = { "t0k3n" = "tsr" }

            [pipeline]
            queue_capacity = 50
            batch_size = 5
            flush_interval_ms = 250

            [storage]
            kind = "memory"
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let dispatcher_config = DispatcherConfig::from(&config.pipeline);
        assert_eq!(dispatcher_config.queue_capacity, 50);
        assert_eq!(dispatcher_config.batch_size, 5);
        assert_eq!(dispatcher_config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.storage.kind, StorageKind::Memory);
        assert_eq!(config.auth.internal_app, "tsr");
        assert_eq!(config.auth.tokens.get("t0k3n").map(String::as_str), Some("tsr"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{ContractError, LogCollection, LogEntry, LogFilter, LogStore};
    use dispatcher::{Dispatcher, DispatcherConfig, DispatcherError, FileStore, MemoryCollection, MemoryStore};
    use ingestion::{Identity, IngestionEndpoint, IngestionError, StatusFrame};
    use live::{LiveListener, MemoryPubSub};
    use tokio::time::timeout;

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: 100,
            batch_size: 10,
            flush_interval: Duration::from_millis(20),
        }
    }

    fn line(app: &str, source: &str, message: &str) -> String {
        let mut encoded = String::from_utf8(
            LogEntry::new(app, source, "u1", message).encode().unwrap().to_vec(),
        )
        .unwrap();
        encoded.push('\n');
        encoded
    }

    /// Ingestion -> Dispatcher -> FileStore, with a live listener attached
    ///
    /// Verifies:
    /// 1. Entries land in one JSON-lines file per application, in order
    /// 2. A filtered live listener sees only its matching entries
    /// 3. The client receives a success status frame
    #[tokio::test]
    async fn test_e2e_ingest_to_file_with_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let pubsub = Arc::new(MemoryPubSub::default());

        let listener = LiveListener::subscribe(pubsub.as_ref(), "web", LogFilter::new("router", ""))
            .await
            .unwrap();

        let mut input = String::new();
        for i in 0..25 {
            let source = if i % 5 == 0 { "router" } else { "app" };
            input.push_str(&line("web", source, &i.to_string()));
        }
        input.push_str(&line("worker", "app", "job done"));

        let endpoint = IngestionEndpoint::new(Arc::clone(&store), Arc::clone(&pubsub), config(), "tsr");
        let mut output = Vec::new();
        let outcome = endpoint
            .handle_connection(Some(&Identity::new("tsr")), input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(outcome.entries, 26);

        let frame: StatusFrame = serde_json::from_slice(&output).unwrap();
        assert!(frame.is_ok());

        let persisted = std::fs::read_to_string(store.collection_path("web")).unwrap();
        let messages: Vec<String> = persisted
            .lines()
            .map(|l| LogEntry::decode(l.as_bytes()).unwrap().message)
            .collect();
        assert_eq!(messages, (0..25).map(|i| i.to_string()).collect::<Vec<_>>());
        assert!(store.collection_path("worker").exists());

        let mut tailed = Vec::new();
        for _ in 0..5 {
            let entry = timeout(Duration::from_secs(1), listener.recv())
                .await
                .unwrap()
                .unwrap();
            tailed.push(entry.message);
        }
        assert_eq!(tailed, vec!["0", "5", "10", "15", "20"]);
    }

    #[tokio::test]
    async fn test_e2e_bad_line_rejected() {
        let store = MemoryStore::new();
        let endpoint = IngestionEndpoint::new(
            Arc::new(store.clone()),
            Arc::new(MemoryPubSub::default()),
            config(),
            "tsr",
        );
        let mut output = Vec::new();

        let err = endpoint
            .handle_connection(Some(&Identity::new("tsr")), &b"not-json\n"[..], &mut output)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestionError::Decode { .. }));
        let frame: StatusFrame = serde_json::from_slice(&output).unwrap();
        assert!(frame.error.unwrap().contains("\"not-json\""));
        assert!(store.app_names().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_lines_before_bad_line_are_kept() {
        let store = MemoryStore::new();
        let endpoint = IngestionEndpoint::new(
            Arc::new(store.clone()),
            Arc::new(MemoryPubSub::default()),
            config(),
            "tsr",
        );
        let input = format!(
            "{}{}not-json\n{}",
            line("web", "app", "first"),
            line("web", "app", "second"),
            line("web", "app", "never"),
        );
        let mut output = Vec::new();

        let err = endpoint
            .handle_connection(Some(&Identity::new("tsr")), input.as_bytes(), &mut output)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestionError::Decode { .. }));
        let frame: StatusFrame = serde_json::from_slice(&output).unwrap();
        assert!(frame.error.unwrap().contains("\"not-json\""));
        let messages: Vec<String> = store.entries("web").into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    /// MemoryStore whose collections for one application always fail to insert
    struct BrokenAppStore {
        inner: MemoryStore,
        broken_app: &'static str,
    }

    struct BrokenAppCollection {
        inner: MemoryCollection,
        broken: bool,
    }

    impl LogStore for BrokenAppStore {
        type Collection = BrokenAppCollection;

        async fn open(&self, app_name: &str) -> Result<BrokenAppCollection, ContractError> {
            Ok(BrokenAppCollection {
                inner: self.inner.open(app_name).await?,
                broken: app_name == self.broken_app,
            })
        }
    }

    impl LogCollection for BrokenAppCollection {
        fn app_name(&self) -> &str {
            self.inner.app_name()
        }

        async fn bulk_insert(&mut self, entries: &[LogEntry]) -> Result<(), ContractError> {
            if self.broken {
                return Err(ContractError::storage_write(self.inner.app_name(), "disk full"));
            }
            self.inner.bulk_insert(entries).await
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.inner.close().await
        }
    }

    /// A failing application does not hold back the others, and its
    /// failure is the only one reported on stop
    #[tokio::test]
    async fn test_e2e_failure_isolated_per_app() {
        let memory = MemoryStore::new();
        let store = Arc::new(BrokenAppStore {
            inner: memory.clone(),
            broken_app: "broken",
        });
        let mut dispatcher = Dispatcher::new(store, Arc::new(MemoryPubSub::default()), config());

        for i in 0..30 {
            dispatcher
                .send(LogEntry::new("healthy", "app", "u1", i.to_string()))
                .await
                .unwrap();
        }
        dispatcher
            .send(LogEntry::new("broken", "app", "u1", "lost"))
            .await
            .unwrap();

        let err = dispatcher.stop().await.unwrap_err();
        assert!(matches!(err, DispatcherError::Persist { .. }));
        assert_eq!(err.app_name(), Some("broken"));
        assert_eq!(memory.entries("healthy").len(), 30);
        assert!(memory.entries("broken").is_empty());
    }
}
