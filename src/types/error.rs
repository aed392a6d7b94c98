//! Error types for the UTXO reservation engine
//!
//! This module defines all error types that can occur while reserving,
//! canceling or replaying reservations.
//!
//! # Error Categories
//!
//! - **Selection Errors**: insufficient funds, outputs already reserved
//! - **Lookup Errors**: unknown outpoint, unknown reservation
//! - **Store Errors**: failures reported by the UTXO store adapter
//! - **Replay I/O Errors**: file and CSV problems in the replay binary

use super::reservation::ReservationId;
use super::utxo::{AccountId, AssetId, Outpoint};
use thiserror::Error;

/// Main error type for the reservation engine
///
/// `Clone` so a single failed attempt can be handed to every caller
/// waiting on the same client token.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReserveError {
    /// The account does not hold enough of the asset, reserved or not
    ///
    /// Not retryable: new units must be deposited first.
    #[error(
        "Insufficient funds in account {account} for asset {asset}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        account: AccountId,
        asset: AssetId,
        /// Total confirmed value of the asset in the account
        available: u64,
        requested: u64,
    },

    /// The account holds enough, but too much of it is held by other reservations
    ///
    /// Retryable once those reservations are canceled, expired or consumed.
    #[error(
        "Outputs of account {account} for asset {asset} already reserved: requested {requested}, {reserved} held elsewhere"
    )]
    AlreadyReserved {
        account: AccountId,
        asset: AssetId,
        requested: u64,
        /// Value skipped because other reservations hold it
        reserved: u64,
    },

    /// No confirmed unspent output exists at this outpoint
    #[error("UTXO {outpoint} not found")]
    UtxoNotFound { outpoint: Outpoint },

    /// No live reservation carries this id
    #[error("Reservation {id} not found")]
    ReservationNotFound { id: ReservationId },

    /// The UTXO store failed to answer
    #[error("UTXO store error: {message}")]
    Store { message: String },

    /// I/O error occurred while reading or writing replay files
    #[error("I/O error: {message}")]
    Io { message: String },

    /// CSV parsing error occurred in a replay file
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        line: Option<u64>,
        message: String,
    },
}

impl From<std::io::Error> for ReserveError {
    fn from(error: std::io::Error) -> Self {
        ReserveError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ReserveError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        ReserveError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl ReserveError {
    pub fn insufficient_funds(
        account: AccountId,
        asset: AssetId,
        available: u64,
        requested: u64,
    ) -> Self {
        ReserveError::InsufficientFunds {
            account,
            asset,
            available,
            requested,
        }
    }

    pub fn already_reserved(
        account: AccountId,
        asset: AssetId,
        requested: u64,
        reserved: u64,
    ) -> Self {
        ReserveError::AlreadyReserved {
            account,
            asset,
            requested,
            reserved,
        }
    }

    pub fn utxo_not_found(outpoint: Outpoint) -> Self {
        ReserveError::UtxoNotFound { outpoint }
    }

    pub fn reservation_not_found(id: ReservationId) -> Self {
        ReserveError::ReservationNotFound { id }
    }

    /// Wrap a store-layer failure
    pub fn store(message: impl std::fmt::Display) -> Self {
        ReserveError::Store {
            message: message.to_string(),
        }
    }

    /// Whether retrying the same request later may succeed without new deposits
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReserveError::AlreadyReserved { .. })
    }

    /// Short snake_case label used in replay output
    pub fn kind(&self) -> &'static str {
        match self {
            ReserveError::InsufficientFunds { .. } => "insufficient_funds",
            ReserveError::AlreadyReserved { .. } => "already_reserved",
            ReserveError::UtxoNotFound { .. } | ReserveError::ReservationNotFound { .. } => {
                "not_found"
            }
            ReserveError::Store { .. } | ReserveError::Io { .. } | ReserveError::Parse { .. } => {
                "error"
            }
        }
    }
}
