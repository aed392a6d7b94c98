//! Concurrent batch replay strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. It replays the request script in batches,
//! running different accounts' requests in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (account partitioning + tokio tasks)
//!     └── Replayer
//!         └── MemoryReserver
//!             └── MemoryUtxoStore
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so a request never overtakes an
//!   earlier batch
//! - Within a batch, each account's requests run in file order
//! - An `expire` row waits for every earlier row and holds back later ones
//! - Requests of different accounts race, so outcomes that depend on
//!   cross-account ordering (reservation ids, unpartitioned cancels) may
//!   differ from the sync strategy

use crate::core::{BatchProcessor, MemoryReserver, MemoryUtxoStore, ReplayConfig, Replayer};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_results_csv;
use crate::io::sync_reader::load_utxos;
use crate::strategy::ProcessingStrategy;
use crate::types::ReserveError;
use chrono::Utc;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for batch replay
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of request rows per batch
    pub batch_size: usize,

    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a config, falling back to defaults for zero values
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches (0), using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    replay: ReplayConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, replay: ReplayConfig) -> Self {
        Self { config, replay }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        utxos_path: &Path,
        requests_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), ReserveError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| ReserveError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let store = Arc::new(MemoryUtxoStore::from_utxos(load_utxos(utxos_path)?));
        info!(utxos = store.len(), "Loaded UTXO snapshot");
        let reserver = Arc::new(MemoryReserver::new(store));
        let processor =
            BatchProcessor::new(Replayer::new(reserver, Utc::now(), self.replay.clone()));

        let results = runtime.block_on(async {
            let file = tokio::fs::File::open(requests_path)
                .await
                .map_err(|e| ReserveError::Io {
                    message: format!(
                        "Failed to open file '{}': {}",
                        requests_path.display(),
                        e
                    ),
                })?;

            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut results = Vec::new();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Finish this batch before reading the next so per-account
                // order holds across batch boundaries.
                results.extend(processor.process_batch(batch).await);
            }

            Ok::<_, ReserveError>(results)
        })?;

        write_results_csv(&results, output)
    }
}
