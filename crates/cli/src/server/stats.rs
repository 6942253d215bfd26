//! Server statistics.

use std::time::Duration;

use ingestion::{IngestOutcome, IngestionError};

/// Statistics from a server run
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Ingestion connections that finished
    pub ingest_connections: u64,

    /// Ingestion connections that ended with an error status
    pub ingest_failures: u64,

    /// Non-empty lines read from ingestion connections
    pub lines_read: u64,

    /// Entries accepted by a dispatcher
    pub entries_ingested: u64,

    /// Entries rejected because their pipeline had failed
    pub storage_errors: u64,

    /// Tail sessions that finished
    pub tail_sessions: u64,

    /// Entries delivered to tail clients
    pub entries_tailed: u64,

    /// Connections still open when the shutdown timeout expired
    pub aborted_connections: u64,

    /// Total duration of the server run
    pub duration: Duration,
}

impl ServerStats {
    pub fn record_ingest(&mut self, result: &Result<IngestOutcome, IngestionError>) {
        self.ingest_connections += 1;
        match result {
            Ok(outcome) => {
                self.lines_read += outcome.lines;
                self.entries_ingested += outcome.entries;
                self.storage_errors += outcome.storage_errors;
            }
            Err(_) => self.ingest_failures += 1,
        }
    }

    pub fn record_tail(&mut self, delivered: u64) {
        self.tail_sessions += 1;
        self.entries_tailed += delivered;
    }

    /// Ingested entries per second over the whole run
    pub fn entries_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.entries_ingested as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed ingestion connections as percentage
    pub fn failure_rate(&self) -> f64 {
        if self.ingest_connections > 0 {
            (self.ingest_failures as f64 / self.ingest_connections as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Server Statistics ===\n");
        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Throughput: {:.2} entries/s", self.entries_per_sec());
        println!("\nIngestion");
        println!("  Connections: {}", self.ingest_connections);
        println!(
            "  Failed: {} ({:.1}%)",
            self.ingest_failures,
            self.failure_rate()
        );
        println!("  Lines read: {}", self.lines_read);
        println!("  Entries ingested: {}", self.entries_ingested);
        println!("  Storage errors: {}", self.storage_errors);
        println!("\nLive tail");
        println!("  Sessions: {}", self.tail_sessions);
        println!("  Entries delivered: {}", self.entries_tailed);
        if self.aborted_connections > 0 {
            println!("\nAborted on shutdown: {}", self.aborted_connections);
        }
        println!();
    }
}
