//! UTXO Reserver Library
//! # Overview
//!
//! This library implements the reservation layer of a UTXO wallet: it decides
//! which unspent outputs a pending transaction may spend and guarantees no
//! output is handed to two concurrent transactions.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Utxo, Source, Reservation, ReserveError, ...)
//! - [`core`] - Reservation logic:
//!   - [`core::reserver`] - Reservation registry (`MemoryReserver`)
//!   - [`core::account_reserver`] - Per-account coin selection and held outputs
//!   - [`core::idempotency`] - Client-token deduplication
//!   - [`core::sweeper`] - Periodic expiry
//!   - [`core::replay`] / [`core::batch_processor`] - Request script replay
//! - [`io`] - CSV snapshot, request and result formats
//! - [`strategy`] - Sequential and concurrent replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Reservation lifecycle
//!
//! - **Reserve**: select the smallest outputs covering an amount, hold them
//!   until an expiry, and report any overshoot as change
//! - **Reserve UTXO**: hold one specific output
//! - **Cancel**: release a reservation's outputs
//! - **Expire**: release every reservation past its expiry
//!
//! Requests carrying a client token are idempotent: concurrent and repeated
//! calls with the same token share one outcome.

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    ExpirySweeper, MemoryReserver, MemoryUtxoStore, ReplayConfig, Replayer, Reserver,
    SweepConfig, UtxoStore,
};
pub use io::write_results_csv;
pub use types::{
    AccountId, AssetId, Change, ClientToken, Hash, Outpoint, Reservation, ReservationId,
    ReserveError, Source, Utxo,
};
