//! Replay strategy module
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing snapshot loading, request script parsing and reservation
//! processing. Different implementations (sequential, concurrent batch) can be
//! selected at runtime.

use crate::cli::StrategyType;
use crate::core::ReplayConfig;
use crate::types::ReserveError;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// A complete replay pipeline
///
/// Loads the UTXO snapshot at `utxos_path` into a fresh reserver, replays the
/// request script at `requests_path` against it, and writes one result row
/// per valid request to `output`.
pub trait ProcessingStrategy: Send + Sync {
    fn process(
        &self,
        utxos_path: &Path,
        requests_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), ReserveError>;
}

/// Build the strategy selected on the command line
///
/// `batch` is only used by the async strategy and defaults when absent.
pub fn create_strategy(
    strategy_type: StrategyType,
    batch: Option<BatchConfig>,
    replay: ReplayConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(replay)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            batch.unwrap_or_default(),
            replay,
        )),
    }
}
