//! In-memory reservation registry
//!
//! This module provides `MemoryReserver`, the engine that selects, holds and
//! releases UTXOs on behalf of spend requests.
//!
//! # Architecture
//!
//! ```text
//! MemoryReserver
//!     ├── Arc<S: UtxoStore>                          (confirmed outputs, read-only)
//!     ├── IdempotencyCache                           (client token → shared outcome)
//!     ├── DashMap<ReservationId, Reservation>        (live reservations)
//!     └── DashMap<AccountId, Arc<AccountReserver>>   (per-account held-sets)
//! ```
//!
//! # Locking
//!
//! No call holds a reservation-map guard and an account domain's lock at the
//! same time: every operation takes one, releases it, then takes the next.
//! Reserving touches the domain first and records the reservation second;
//! canceling and expiring remove the record first and release the domain
//! second. Account-map guards are only held long enough to clone the domain's
//! `Arc`, except during eviction, where the domain lock is taken under the
//! account-map shard guard (never the other way around).
//!
//! # Identifiers
//!
//! Reservation ids come from an `AtomicU32` starting at 1. The counter wraps
//! past `u32::MAX` without any guard. Failed attempts consume ids too.
//!
//! # Client tokens
//!
//! `reserve` and `reserve_utxo` cache outcomes under separate keys, so a token
//! used for coin selection never answers a request for a specific outpoint.

use crate::core::account_reserver::{AccountReserver, Attempt};
use crate::core::idempotency::IdempotencyCache;
use crate::core::traits::{Reserver, UtxoStore};
use crate::types::{
    AccountId, Change, ClientToken, Hash, Outpoint, Reservation, ReservationId, ReserveError,
    Source, Utxo,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

type Outcome = Result<Reservation, ReserveError>;

fn source_key(token: &str) -> String {
    format!("source:{token}")
}

fn outpoint_key(token: &str) -> String {
    format!("outpoint:{token}")
}

/// UTXO reserver that keeps all reservation state in memory
///
/// The store is the source of truth for which outputs exist; which of them
/// are held is tracked here only.
#[derive(Debug)]
pub struct MemoryReserver<S> {
    store: Arc<S>,
    next_id: AtomicU32,
    idempotency: IdempotencyCache<Outcome>,
    reservations: DashMap<ReservationId, Reservation>,
    accounts: DashMap<AccountId, Arc<AccountReserver>>,
}

impl<S: UtxoStore> MemoryReserver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            next_id: AtomicU32::new(0),
            idempotency: IdempotencyCache::new(),
            reservations: DashMap::new(),
            accounts: DashMap::new(),
        }
    }

    /// The store this reserver reads candidates from
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Snapshot of a live reservation
    pub fn get(&self, id: ReservationId) -> Option<Reservation> {
        self.reservations.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of live reservations
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Number of account lock domains currently allocated
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Reservation currently holding `outpoint`, if any
    pub fn holder(&self, outpoint: &Outpoint) -> Option<ReservationId> {
        self.accounts
            .iter()
            .find_map(|entry| entry.value().holder(outpoint))
    }

    /// Whether any live reservation holds `outpoint`
    pub fn is_reserved(&self, outpoint: &Outpoint) -> bool {
        self.holder(outpoint).is_some()
    }

    /// Discard whatever outcome is cached for `token`
    ///
    /// Failed attempts stay cached under their token; forgetting one lets the
    /// caller retry with the same token. Clears both `reserve` and
    /// `reserve_utxo` entries.
    pub fn forget_token(&self, token: &str) -> bool {
        let source = self.idempotency.forget(&source_key(token));
        let outpoint = self.idempotency.forget(&outpoint_key(token));
        source || outpoint
    }

    fn next_reservation_id(&self) -> ReservationId {
        self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    fn account(&self, account_id: &AccountId) -> Arc<AccountReserver> {
        if let Some(domain) = self.accounts.get(account_id) {
            return Arc::clone(domain.value());
        }
        Arc::clone(
            self.accounts
                .entry(account_id.clone())
                .or_insert_with(|| Arc::new(AccountReserver::new()))
                .value(),
        )
    }

    /// Run `attempt` against the account's live domain, replacing a domain
    /// that was evicted between lookup and lock
    fn with_account<T>(
        &self,
        account_id: &AccountId,
        attempt: impl Fn(&AccountReserver) -> Attempt<T>,
    ) -> T {
        loop {
            let domain = self.account(account_id);
            match attempt(domain.as_ref()) {
                Attempt::Done(result) => return result,
                Attempt::Retired => {
                    // Drop the stale entry if eviction hasn't already.
                    self.accounts
                        .remove_if(account_id, |_, current| Arc::ptr_eq(current, &domain));
                }
            }
        }
    }

    fn record(&self, reservation: Reservation) -> Reservation {
        debug!(
            id = reservation.id,
            account = %reservation.account_id,
            utxos = reservation.utxos.len(),
            held = reservation.total(),
            "Reserver: reservation created"
        );
        self.reservations.insert(reservation.id, reservation.clone());
        reservation
    }

    fn release(&self, reservation: &Reservation) {
        let domain = self
            .accounts
            .get(&reservation.account_id)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(domain) = domain {
            domain.release(reservation);
        }
        // The token may have been re-bound to a newer reservation since.
        if let Some(token) = &reservation.client_token {
            for key in [source_key(token), outpoint_key(token)] {
                self.idempotency.forget_if(&key, |outcome| {
                    matches!(outcome, Ok(cached) if cached.id == reservation.id)
                });
            }
        }
    }

    async fn reserve_source(&self, source: Source, expiry: DateTime<Utc>) -> Outcome {
        if let Some((tx_hash, index)) = source.forced_outpoint() {
            return self.reserve_forced(source, tx_hash, index, expiry).await;
        }

        let candidates = self
            .store
            .find_candidates(&source.account_id, &source.asset_id)
            .await?;

        let id = self.next_reservation_id();
        let (utxos, total) = self
            .with_account(&source.account_id, |domain| {
                domain.reserve_against_candidates(
                    id,
                    &source.account_id,
                    &source.asset_id,
                    source.amount,
                    &candidates,
                )
            })
            .inspect_err(|e| debug!(account = %source.account_id, error = %e, "Reserver: selection rejected"))?;

        let mut change = Vec::new();
        if total > source.amount {
            change.push(Change {
                source: source.clone(),
                amount: total - source.amount,
            });
        }

        Ok(self.record(Reservation {
            id,
            account_id: source.account_id,
            utxos,
            change,
            expiry,
            client_token: source.client_token,
        }))
    }

    /// `Source` with both outpoint fields set: hold that output only
    async fn reserve_forced(
        &self,
        source: Source,
        tx_hash: Hash,
        index: u32,
        expiry: DateTime<Utc>,
    ) -> Outcome {
        let outpoint = Outpoint::new(tx_hash, index);
        let utxo = self
            .store
            .find_specific(&tx_hash, index)
            .await?
            .filter(|u| u.account_id == source.account_id && u.asset_id == source.asset_id)
            .ok_or_else(|| ReserveError::utxo_not_found(outpoint))?;

        if utxo.amount < source.amount {
            return Err(ReserveError::insufficient_funds(
                source.account_id.clone(),
                source.asset_id,
                utxo.amount,
                source.amount,
            ));
        }

        let id = self.hold_specific(&utxo)?;
        let mut change = Vec::new();
        if utxo.amount > source.amount {
            change.push(Change {
                source: source.clone(),
                amount: utxo.amount - source.amount,
            });
        }

        Ok(self.record(Reservation {
            id,
            account_id: source.account_id,
            utxos: vec![utxo],
            change,
            expiry,
            client_token: source.client_token,
        }))
    }

    async fn reserve_outpoint(
        &self,
        tx_hash: Hash,
        index: u32,
        client_token: Option<ClientToken>,
        expiry: DateTime<Utc>,
    ) -> Outcome {
        let utxo = self
            .store
            .find_specific(&tx_hash, index)
            .await?
            .ok_or_else(|| ReserveError::utxo_not_found(Outpoint::new(tx_hash, index)))?;

        let id = self.hold_specific(&utxo)?;

        Ok(self.record(Reservation {
            id,
            account_id: utxo.account_id.clone(),
            utxos: vec![utxo],
            change: Vec::new(),
            expiry,
            client_token,
        }))
    }

    fn hold_specific(&self, utxo: &Utxo) -> Result<ReservationId, ReserveError> {
        let id = self.next_reservation_id();
        self.with_account(&utxo.account_id, |domain| domain.reserve_specific(id, utxo))?;
        Ok(id)
    }
}

#[async_trait]
impl<S: UtxoStore> Reserver for MemoryReserver<S> {
    /// Reserve `source.amount` of `source.asset_id` from `source.account_id`
    ///
    /// With a client token, concurrent and repeated calls carrying the same
    /// token share a single attempt and its outcome until the resulting
    /// reservation is canceled or expired.
    ///
    /// # Errors
    ///
    /// - `InsufficientFunds` if the account's total value for the asset,
    ///   held or not, is below the request
    /// - `AlreadyReserved` if enough value exists but other reservations hold it
    /// - `UtxoNotFound` if the source forces an outpoint that doesn't exist
    ///   for this account and asset
    /// - `Store` if the candidate query fails
    async fn reserve(&self, source: Source, expiry: DateTime<Utc>) -> Outcome {
        match source.client_token.clone() {
            None => self.reserve_source(source, expiry).await,
            Some(token) => {
                self.idempotency
                    .once(&source_key(&token), || self.reserve_source(source, expiry))
                    .await
            }
        }
    }

    /// Reserve exactly the output at (`tx_hash`, `index`), bypassing coin selection
    ///
    /// A client token deduplicates like in `reserve`, but only against other
    /// `reserve_utxo` calls.
    ///
    /// # Errors
    ///
    /// - `UtxoNotFound` if the store has no unspent output there
    /// - `AlreadyReserved` if another reservation holds it
    async fn reserve_utxo(
        &self,
        tx_hash: Hash,
        index: u32,
        client_token: Option<ClientToken>,
        expiry: DateTime<Utc>,
    ) -> Outcome {
        match client_token.clone() {
            None => self.reserve_outpoint(tx_hash, index, None, expiry).await,
            Some(token) => {
                self.idempotency
                    .once(&outpoint_key(&token), || {
                        self.reserve_outpoint(tx_hash, index, client_token, expiry)
                    })
                    .await
            }
        }
    }

    async fn cancel(&self, id: ReservationId) -> Result<(), ReserveError> {
        let (_, reservation) = self
            .reservations
            .remove(&id)
            .ok_or_else(|| ReserveError::reservation_not_found(id))?;

        self.release(&reservation);
        debug!(id, account = %reservation.account_id, "Reserver: reservation canceled");
        Ok(())
    }

    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<(), ReserveError> {
        let expired_ids: Vec<ReservationId> = self
            .reservations
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| *entry.key())
            .collect();

        // Anything canceled since the scan is simply skipped.
        let expired: Vec<Reservation> = expired_ids
            .into_iter()
            .filter_map(|id| self.reservations.remove(&id).map(|(_, res)| res))
            .collect();

        for reservation in &expired {
            self.release(reservation);
        }

        let before = self.accounts.len();
        self.accounts.retain(|_, domain| !domain.try_retire());
        let evicted = before.saturating_sub(self.accounts.len());

        if !expired.is_empty() {
            info!(
                released = expired.len(),
                evicted_accounts = evicted,
                "Reserver: expired reservations released"
            );
        } else if evicted > 0 {
            debug!(evicted_accounts = evicted, "Reserver: idle account domains evicted");
        }
        Ok(())
    }
}
