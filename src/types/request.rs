//! Replay request and result types
//!
//! A replay script is a sequence of reservation requests applied to a fresh
//! reserver. These types are the parsed form of one script row and the
//! outcome recorded for it.

use super::reservation::{ClientToken, ReservationId, Source};
use super::utxo::{AccountId, Hash};

/// Identifier of a request within a replay script
pub type RequestId = u32;

/// Operation requested by one script row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Coin-selected reservation for `source`
    Reserve { source: Source, ttl_secs: Option<u64> },

    /// Reservation of one specific output
    ReserveUtxo {
        tx_hash: Hash,
        index: u32,
        client_token: Option<ClientToken>,
        ttl_secs: Option<u64>,
    },

    /// Cancel the reservation created by request `target`
    Cancel { target: RequestId },

    /// Sweep everything expired at the row's logical time
    Expire,
}

impl Request {
    /// snake_case operation name, as written in scripts and results
    pub fn op(&self) -> &'static str {
        match self {
            Request::Reserve { .. } => "reserve",
            Request::ReserveUtxo { .. } => "reserve_utxo",
            Request::Cancel { .. } => "cancel",
            Request::Expire => "expire",
        }
    }
}

/// One parsed script row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Script-unique request id
    pub id: RequestId,

    /// Account used to partition concurrent replay
    ///
    /// Always set for `reserve`; optional for the other operations.
    pub account: Option<AccountId>,

    /// Logical offset, in seconds, from replay start
    pub at: u64,

    pub request: Request,
}

/// Outcome of replaying one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    pub id: RequestId,
    pub op: &'static str,

    /// `ok`, or the error kind (`insufficient_funds`, `already_reserved`, ...)
    pub outcome: &'static str,

    /// Reservation created or canceled by this request
    pub reservation: Option<ReservationId>,

    pub account: Option<AccountId>,

    /// Total value held by the created reservation
    pub held: Option<u64>,

    /// Total change of the created reservation
    pub change: Option<u64>,
}
