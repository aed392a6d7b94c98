//! UTXO reservation replay CLI
//!
//! Loads a UTXO snapshot, replays a script of reservation requests against a
//! fresh in-memory reserver, and prints one result row per request.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- utxos.csv requests.csv > results.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 utxos.csv requests.csv
//! RUST_LOG=utxo_reserver=debug cargo run -- --default-ttl 60 utxos.csv requests.csv
//! ```
//!
//! Logs go to stderr; the filter comes from `RUST_LOG` and defaults to `warn`.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use std::process;
use tracing_subscriber::EnvFilter;
use utxo_reserver::cli;
use utxo_reserver::strategy;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = cli::parse_args();

    let strategy = {
        let batch = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
        strategy::create_strategy(args.strategy.clone(), batch, args.to_replay_config())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.utxos_file, &args.requests_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
