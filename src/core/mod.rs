//! Core reservation logic
//!
//! This module contains the reservation engine and its collaborators:
//! - `traits` - `UtxoStore` and `Reserver` abstractions
//! - `utxo_store` - In-memory UTXO store
//! - `account_reserver` - Per-account held-output bookkeeping
//! - `idempotency` - Run-once cache keyed by client token
//! - `reserver` - Reservation registry
//! - `sweeper` - Periodic expiry driver
//! - `replay` - Applies request scripts to a reserver
//! - `batch_processor` - Account-partitioned concurrent replay

pub mod account_reserver;
pub mod batch_processor;
pub mod idempotency;
pub mod replay;
pub mod reserver;
pub mod sweeper;
pub mod traits;
pub mod utxo_store;

pub use account_reserver::{AccountReserver, Attempt};
pub use batch_processor::BatchProcessor;
pub use idempotency::IdempotencyCache;
pub use replay::{ReplayConfig, Replayer};
pub use reserver::MemoryReserver;
pub use sweeper::{ExpirySweeper, SweepConfig};
pub use traits::{Reserver, UtxoStore};
pub use utxo_store::MemoryUtxoStore;
