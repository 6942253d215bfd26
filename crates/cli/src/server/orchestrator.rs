//! Server orchestrator - binds the listeners and supervises connections.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{LogStore, PubSub, ServerConfig};
use dispatcher::DispatcherConfig;
use ingestion::IngestionEndpoint;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::connection::{handle_ingest, handle_tail, ConnectionReport};
use super::ServerStats;
use crate::error::{CliError, Result};

/// Bound ingest and tail listeners sharing one store and one broker
pub struct Server<S, P> {
    ingest: TcpListener,
    tail: TcpListener,
    endpoint: Arc<IngestionEndpoint<S, P>>,
    pubsub: Arc<P>,
    tokens: Arc<HashMap<String, String>>,
    delivery_capacity: usize,
    shutdown_timeout: Duration,
}

impl<S, P> Server<S, P>
where
    S: LogStore + Sync + 'static,
    P: PubSub + Sync + 'static,
{
    /// Bind both listeners
    pub async fn bind(
        config: &ServerConfig,
        store: Arc<S>,
        pubsub: Arc<P>,
        shutdown_timeout: Duration,
    ) -> Result<Self> {
        let ingest = TcpListener::bind(&config.server.ingest_addr)
            .await
            .map_err(|e| CliError::bind(&config.server.ingest_addr, e))?;
        let tail = TcpListener::bind(&config.server.tail_addr)
            .await
            .map_err(|e| CliError::bind(&config.server.tail_addr, e))?;

        let endpoint = IngestionEndpoint::new(
            store,
            Arc::clone(&pubsub),
            DispatcherConfig::from(&config.pipeline),
            config.auth.internal_app.clone(),
        );

        Ok(Self {
            ingest,
            tail,
            endpoint: Arc::new(endpoint),
            pubsub,
            tokens: Arc::new(config.auth.tokens.clone()),
            delivery_capacity: config.live.delivery_capacity,
            shutdown_timeout,
        })
    }

    pub fn ingest_addr(&self) -> Result<SocketAddr> {
        Ok(self.ingest.local_addr()?)
    }

    pub fn tail_addr(&self) -> Result<SocketAddr> {
        Ok(self.tail.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves, then drain
    ///
    /// Tail sessions are ended immediately; ingestion connections get
    /// `shutdown_timeout` to finish before they are aborted.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<ServerStats> {
        let start_time = Instant::now();
        let mut stats = ServerStats::default();
        let mut connections = JoinSet::new();
        let (stop_tx, stop_rx) = watch::channel(false);

        info!(
            ingest_addr = %self.ingest_addr()?,
            tail_addr = %self.tail_addr()?,
            "Server listening"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.ingest.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_ingest(
                            Arc::clone(&self.endpoint),
                            Arc::clone(&self.tokens),
                            stream,
                            peer,
                        ));
                    }
                    Err(e) => warn!(error = %e, "Failed to accept ingest connection"),
                },
                accepted = self.tail.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_tail(
                            Arc::clone(&self.pubsub),
                            self.delivery_capacity,
                            stream,
                            peer,
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "Failed to accept tail connection"),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    record(&mut stats, joined);
                }
            }
        }

        let _ = stop_tx.send(true);
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while let Some(joined) = connections.join_next().await {
                record(&mut stats, joined);
            }
        })
        .await;
        if drained.is_err() {
            stats.aborted_connections = connections.len() as u64;
            warn!(
                remaining = connections.len(),
                "Shutdown timeout, aborting open connections"
            );
            connections.shutdown().await;
        }

        stats.duration = start_time.elapsed();
        info!(
            ingest_connections = stats.ingest_connections,
            entries_ingested = stats.entries_ingested,
            tail_sessions = stats.tail_sessions,
            duration_secs = stats.duration.as_secs_f64(),
            "Server stopped"
        );
        Ok(stats)
    }
}

fn record(
    stats: &mut ServerStats,
    joined: std::result::Result<ConnectionReport, tokio::task::JoinError>,
) {
    match joined {
        Ok(ConnectionReport::Ingest(result)) => stats.record_ingest(&result),
        Ok(ConnectionReport::Tail(delivered)) => stats.record_tail(delivered),
        Err(e) => warn!(error = %e, "Connection task failed"),
    }
}
