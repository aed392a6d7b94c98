//! Core traits for the UTXO store boundary and the reserver surface
//!
//! `UtxoStore` is what the engine consumes (the persistent source of truth for
//! confirmed outputs). `Reserver` is what the engine exposes to
//! transaction-building callers and to the expiry sweeper.

use crate::types::{AccountId, AssetId, Hash, Reservation, ReservationId, ReserveError, Source, Utxo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read-only query interface over confirmed, unspent outputs
///
/// The store is authoritative for *existence* only. Whether an output is
/// currently held is tracked by the reserver, never by the store.
#[async_trait]
pub trait UtxoStore: Send + Sync {
    /// All unspent outputs of `asset_id` owned by `account_id`, ascending by amount
    async fn find_candidates(
        &self,
        account_id: &AccountId,
        asset_id: &AssetId,
    ) -> Result<Vec<Utxo>, ReserveError>;

    /// The unspent output at (`tx_hash`, `index`), or `None` if there is none
    async fn find_specific(&self, tx_hash: &Hash, index: u32) -> Result<Option<Utxo>, ReserveError>;
}

/// Reservation lifecycle operations
#[async_trait]
pub trait Reserver: Send + Sync {
    /// Reserve `source.amount` of `source.asset_id` from `source.account_id`
    async fn reserve(
        &self,
        source: Source,
        expiry: DateTime<Utc>,
    ) -> Result<Reservation, ReserveError>;

    /// Reserve exactly the output at (`tx_hash`, `index`)
    async fn reserve_utxo(
        &self,
        tx_hash: Hash,
        index: u32,
        client_token: Option<String>,
        expiry: DateTime<Utc>,
    ) -> Result<Reservation, ReserveError>;

    /// Best-effort cancellation; unknown ids fail with `ReservationNotFound`
    async fn cancel(&self, id: ReservationId) -> Result<(), ReserveError>;

    /// Release every reservation whose expiry is at or before `now`
    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<(), ReserveError>;
}
