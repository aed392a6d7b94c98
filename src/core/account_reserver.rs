//! Per-account lock domain
//!
//! This module provides the `AccountReserver` struct, which owns the set of
//! outpoints currently held for one account and runs coin selection against
//! it.
//!
//! # Design
//!
//! Each account gets its own `AccountReserver` with a private mutex, so
//! reservations against unrelated accounts never contend. The held-set maps
//! each outpoint to the id of the reservation holding it. An outpoint in the
//! held-set is unavailable to every other request regardless of what the
//! store says.
//!
//! # Eviction
//!
//! A domain whose held-set is empty may be evicted by the registry. Eviction
//! marks the domain as retired under its own lock; any caller that raced the
//! eviction and still holds an `Arc` to it gets [`Attempt::Retired`] back and
//! must look the account up again. This keeps at most one live domain per
//! account, so an outpoint can never be held in two places at once.

use crate::types::{AccountId, AssetId, Outpoint, Reservation, ReservationId, ReserveError, Utxo};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Outcome of an operation on a domain that may have been evicted
#[derive(Debug, PartialEq)]
#[must_use]
pub enum Attempt<T> {
    /// The operation ran against a live domain
    Done(T),
    /// The domain was evicted before the lock was acquired; retry on a fresh one
    Retired,
}

#[derive(Debug, Default)]
struct HeldSet {
    held: HashMap<Outpoint, ReservationId>,
    retired: bool,
}

/// Lock domain for a single account
#[derive(Debug, Default)]
pub struct AccountReserver {
    state: Mutex<HeldSet>,
}

impl AccountReserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest-first coin selection against `candidates`
    ///
    /// `candidates` must be sorted by ascending amount. Held outputs are
    /// skipped but their value is counted as unavailable, which is what
    /// distinguishes `InsufficientFunds` (the account is short even counting
    /// held value) from `AlreadyReserved` (enough value exists but is held).
    ///
    /// On success every selected outpoint is recorded under `id` and the
    /// selected outputs are returned with their total.
    pub fn reserve_against_candidates(
        &self,
        id: ReservationId,
        account: &AccountId,
        asset: &AssetId,
        requested: u64,
        candidates: &[Utxo],
    ) -> Attempt<Result<(Vec<Utxo>, u64), ReserveError>> {
        let mut state = self.state.lock();
        if state.retired {
            return Attempt::Retired;
        }

        let mut reserved: u64 = 0;
        let mut unavailable: u64 = 0;
        let mut selected = Vec::new();

        for utxo in candidates {
            if state.held.contains_key(&utxo.outpoint) {
                unavailable = unavailable.saturating_add(utxo.amount);
                continue;
            }

            reserved = reserved.saturating_add(utxo.amount);
            selected.push(utxo.clone());
            if reserved >= requested {
                break;
            }
        }

        if reserved.saturating_add(unavailable) < requested {
            return Attempt::Done(Err(ReserveError::insufficient_funds(
                account.clone(),
                *asset,
                reserved.saturating_add(unavailable),
                requested,
            )));
        }
        if reserved < requested {
            return Attempt::Done(Err(ReserveError::already_reserved(
                account.clone(),
                *asset,
                requested,
                unavailable,
            )));
        }

        for utxo in &selected {
            state.held.insert(utxo.outpoint, id);
        }
        Attempt::Done(Ok((selected, reserved)))
    }

    /// Hold exactly one output, failing if it is already held
    pub fn reserve_specific(&self, id: ReservationId, utxo: &Utxo) -> Attempt<Result<(), ReserveError>> {
        let mut state = self.state.lock();
        if state.retired {
            return Attempt::Retired;
        }

        if state.held.contains_key(&utxo.outpoint) {
            return Attempt::Done(Err(ReserveError::already_reserved(
                utxo.account_id.clone(),
                utxo.asset_id,
                utxo.amount,
                utxo.amount,
            )));
        }

        state.held.insert(utxo.outpoint, id);
        Attempt::Done(Ok(()))
    }

    /// Drop every outpoint the reservation holds
    ///
    /// Idempotent; entries that are missing, or held under another id, are
    /// left alone.
    pub fn release(&self, reservation: &Reservation) {
        let mut state = self.state.lock();
        for utxo in &reservation.utxos {
            if state.held.get(&utxo.outpoint) == Some(&reservation.id) {
                state.held.remove(&utxo.outpoint);
            }
        }
    }

    /// Retire the domain if nothing is held; returns whether it is now retired
    pub fn try_retire(&self) -> bool {
        let mut state = self.state.lock();
        if state.held.is_empty() {
            state.retired = true;
        }
        state.retired
    }

    /// Reservation currently holding `outpoint`, if any
    pub fn holder(&self, outpoint: &Outpoint) -> Option<ReservationId> {
        self.state.lock().held.get(outpoint).copied()
    }

    /// Number of outpoints currently held
    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }
}
