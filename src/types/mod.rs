//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `utxo`: identifiers and the immutable UTXO record
//! - `reservation`: reservation requests, reservations and change
//! - `request`: replay script requests and their results
//! - `error`: Error types for the reservation engine

pub mod error;
pub mod request;
pub mod reservation;
pub mod utxo;

pub use error::ReserveError;
pub use request::{ReplayResult, Request, RequestId, RequestRecord};
pub use reservation::{Change, ClientToken, Reservation, ReservationId, Source};
pub use utxo::{AccountId, AssetId, Hash, Outpoint, ParseIdError, Utxo};
