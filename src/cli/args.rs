use crate::core::ReplayConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the replay binary
#[derive(Parser, Debug)]
#[command(name = "utxo-reserver")]
#[command(about = "Replay UTXO reservation requests against a snapshot", long_about = None)]
pub struct CliArgs {
    #[arg(value_name = "UTXOS", help = "Path to the UTXO snapshot CSV file")]
    pub utxos_file: PathBuf,

    #[arg(value_name = "REQUESTS", help = "Path to the request script CSV file")]
    pub requests_file: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Replay strategy: 'sync' for file order or 'async' for account-parallel batches"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for batch replay (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    #[arg(
        long = "default-ttl",
        value_name = "SECS",
        help = "TTL for requests without ttl_secs (default: 300)"
    )]
    pub default_ttl_secs: Option<u64>,
}

/// Replay strategy selection
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_replay_config(&self) -> ReplayConfig {
        match self.default_ttl_secs {
            Some(secs) => ReplayConfig::new(Duration::from_secs(secs)),
            None => ReplayConfig::default(),
        }
    }
}
