//! Sequential replay strategy
//!
//! Applies every request in file order on a single-threaded tokio runtime.
//! Output is fully deterministic, which makes this the reference strategy for
//! comparing against the concurrent one.
//!
//! The strategy only orchestrates, delegating:
//! - CSV parsing to `SyncReader` and `load_utxos`
//! - Request handling to `Replayer`
//! - CSV output to `csv_format::write_results_csv`

use crate::core::{MemoryReserver, MemoryUtxoStore, ReplayConfig, Replayer};
use crate::io::csv_format::write_results_csv;
use crate::io::sync_reader::{load_utxos, SyncReader};
use crate::strategy::ProcessingStrategy;
use crate::types::ReserveError;
use chrono::Utc;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    replay: ReplayConfig,
}

impl SyncProcessingStrategy {
    pub fn new(replay: ReplayConfig) -> Self {
        Self { replay }
    }
}

impl Default for SyncProcessingStrategy {
    fn default() -> Self {
        Self::new(ReplayConfig::default())
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        utxos_path: &Path,
        requests_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), ReserveError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| ReserveError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let store = Arc::new(MemoryUtxoStore::from_utxos(load_utxos(utxos_path)?));
        info!(utxos = store.len(), "Loaded UTXO snapshot");
        let reserver = Arc::new(MemoryReserver::new(store));
        let replayer = Replayer::new(reserver, Utc::now(), self.replay.clone());

        let reader = SyncReader::new(requests_path)?;

        let mut results = Vec::new();
        for row in reader {
            match row {
                Ok(record) => results.push(runtime.block_on(replayer.apply(record))),
                Err(e) => warn!(error = %e, "Skipping request row"),
            }
        }

        write_results_csv(&results, output)
    }
}
