//! IngestionEndpoint - one authenticated stream of log lines per connection

use std::sync::Arc;

use contracts::{LogEntry, LogStore, PubSub};
use dispatcher::{Dispatcher, DispatcherConfig};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IngestionError, Result};

/// Longest accepted log line, newline excluded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Authenticated caller of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub app_name: String,
}

impl Identity {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

/// Counters for a connection that ended without a fatal error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Non-empty lines read
    pub lines: u64,
    /// Entries accepted by the dispatcher
    pub entries: u64,
    /// Entries rejected because their pipeline had failed
    pub storage_errors: u64,
}

/// Final message written to the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub error: Option<String>,
}

impl StatusFrame {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct IngestionEndpoint<S, P> {
    store: Arc<S>,
    pubsub: Arc<P>,
    config: DispatcherConfig,
    privileged_app: String,
}

impl<S, P> IngestionEndpoint<S, P>
where
    S: LogStore + Sync + 'static,
    P: PubSub + Sync + 'static,
{
    /// Only identities of `privileged_app` may push logs
    pub fn new(
        store: Arc<S>,
        pubsub: Arc<P>,
        config: DispatcherConfig,
        privileged_app: impl Into<String>,
    ) -> Self {
        Self {
            store,
            pubsub,
            config,
            privileged_app: privileged_app.into(),
        }
    }

    pub fn privileged_app(&self) -> &str {
        &self.privileged_app
    }

    /// Consume `reader` to its end, then report the status on `writer`
    ///
    /// The status frame is written whatever the outcome; the returned error
    /// is the one the frame carries.
    #[instrument(
        name = "ingestion_connection",
        skip_all,
        fields(identity = identity.map(|i| i.app_name.as_str()))
    )]
    pub async fn handle_connection<R, W>(
        &self,
        identity: Option<&Identity>,
        reader: R,
        mut writer: W,
    ) -> Result<IngestOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.ingest(identity, reader).await;

        let frame = StatusFrame {
            error: result.as_ref().err().map(ToString::to_string),
        };
        let written = write_frame(&mut writer, &frame).await;

        match &result {
            Ok(outcome) => {
                observability::record_ingest_connection(true, outcome.entries);
                info!(
                    lines = outcome.lines,
                    entries = outcome.entries,
                    storage_errors = outcome.storage_errors,
                    "Ingestion connection finished"
                );
            }
            Err(e) => {
                observability::record_ingest_connection(false, 0);
                warn!(error = %e, "Ingestion connection failed");
            }
        }

        let outcome = result?;
        written.map_err(IngestionError::Write)?;
        Ok(outcome)
    }

    async fn ingest<R>(&self, identity: Option<&Identity>, mut reader: R) -> Result<IngestOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        let identity = identity.ok_or(IngestionError::MissingIdentity)?;
        if identity.app_name != self.privileged_app {
            return Err(IngestionError::InvalidIdentity {
                app_name: identity.app_name.clone(),
            });
        }

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.pubsub),
            self.config.clone(),
        );
        let mut outcome = IngestOutcome::default();
        let mut line = Vec::new();

        let read_result = loop {
            line.clear();
            match (&mut reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut line)
                .await
            {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
            if line.len() > MAX_LINE_BYTES && line.last() != Some(&b'\n') {
                break Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("log line longer than {MAX_LINE_BYTES} bytes"),
                ));
            }

            let data = line.trim_ascii();
            if data.is_empty() {
                continue;
            }
            outcome.lines += 1;

            let entry = match LogEntry::decode(data) {
                Ok(entry) => entry,
                Err(source) => {
                    if let Err(e) = dispatcher.stop().await {
                        warn!(error = %e, "Dispatcher stop failed after bad line");
                    }
                    return Err(IngestionError::Decode {
                        line: String::from_utf8_lossy(data).into_owned(),
                        source,
                    });
                }
            };

            match dispatcher.send(entry).await {
                Ok(()) => outcome.entries += 1,
                Err(e) => {
                    outcome.storage_errors += 1;
                    error!(error = %e, "wslogs: error storing log");
                }
            }
        };

        debug!(lines = outcome.lines, "Stream ended, stopping dispatcher");
        dispatcher.stop().await.map_err(IngestionError::Storage)?;
        read_result.map_err(IngestionError::Read)?;
        Ok(outcome)
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &StatusFrame) -> std::io::Result<()> {
    let mut data = serde_json::to_vec(frame)?;
    data.push(b'\n');
    writer.write_all(&data).await?;
    writer.flush().await?;
    writer.shutdown().await
}
