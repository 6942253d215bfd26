//! Per-connection handlers for the ingest and tail listeners.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{LogFilter, LogStore, PubSub};
use ingestion::{Identity, IngestOutcome, IngestionEndpoint, IngestionError};
use live::LiveListener;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{CliError, Result};

/// First line of a tail connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailRequest {
    pub app_name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub unit: String,
}

/// What a finished connection reports back to the accept loop
pub(crate) enum ConnectionReport {
    Ingest(std::result::Result<IngestOutcome, IngestionError>),
    Tail(u64),
}

/// Ingest connection: a token line, then log lines until EOF
#[instrument(name = "ingest_connection", skip_all, fields(%peer))]
pub(crate) async fn handle_ingest<S, P>(
    endpoint: Arc<IngestionEndpoint<S, P>>,
    tokens: Arc<HashMap<String, String>>,
    stream: TcpStream,
    peer: SocketAddr,
) -> ConnectionReport
where
    S: LogStore + Sync + 'static,
    P: PubSub + Sync + 'static,
{
    let (read, write) = stream.into_split();
    let mut reader = BufReader::new(read);

    let mut token = String::new();
    let identity = match reader.read_line(&mut token).await {
        Ok(_) => tokens.get(token.trim()).map(Identity::new),
        Err(e) => {
            warn!(error = %e, "Failed to read token line");
            None
        }
    };
    if identity.is_none() {
        debug!("Connection without a known token");
    }

    ConnectionReport::Ingest(
        endpoint
            .handle_connection(identity.as_ref(), reader, write)
            .await,
    )
}

/// Tail connection: a `TailRequest` line, then matching entries as JSON lines
#[instrument(name = "tail_connection", skip_all, fields(%peer))]
pub(crate) async fn handle_tail<P: PubSub + Sync + 'static>(
    pubsub: Arc<P>,
    delivery_capacity: usize,
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> ConnectionReport {
    match tail(pubsub.as_ref(), delivery_capacity, stream, shutdown).await {
        Ok(delivered) => {
            info!(delivered, "Tail session finished");
            ConnectionReport::Tail(delivered)
        }
        Err(e) => {
            warn!(error = %e, "Tail session failed");
            ConnectionReport::Tail(0)
        }
    }
}

async fn tail<P: PubSub + Sync>(
    pubsub: &P,
    delivery_capacity: usize,
    stream: TcpStream,
    mut shutdown: watch::Receiver<bool>,
) -> Result<u64> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let request: TailRequest = serde_json::from_str(line.trim())
        .map_err(|e| CliError::tail_request(e.to_string()))?;
    if request.app_name.is_empty() {
        return Err(CliError::tail_request("app_name is required"));
    }

    let filter = LogFilter::new(request.source, request.unit);
    let mut listener =
        LiveListener::with_capacity(pubsub, &request.app_name, filter, delivery_capacity)
            .await
            .map_err(|e| CliError::tail_request(e.to_string()))?;
    info!(app = %request.app_name, "Tail session started");

    let mut delivered = 0;
    let mut scratch = [0u8; 256];
    loop {
        tokio::select! {
            entry = listener.recv() => {
                let Some(entry) = entry else { break };
                let Ok(encoded) = entry.encode() else { continue };
                let mut data = encoded.to_vec();
                data.push(b'\n');
                if let Err(e) = write.write_all(&data).await {
                    debug!(error = %e, "Tail client gone");
                    break;
                }
                delivered += 1;
            }
            // Anything after the request line is ignored; EOF ends the session
            read = reader.read(&mut scratch) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            },
            _ = shutdown.changed() => break,
        }
    }

    if let Err(e) = listener.close().await {
        warn!(error = %e, "Failed to close live listener");
    }
    Ok(delivered)
}
