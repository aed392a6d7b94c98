//! Replay of request scripts against a reserver
//!
//! This module provides the `Replayer`, which applies parsed script rows to a
//! [`Reserver`] and records one [`ReplayResult`] per row.
//!
//! # Time
//!
//! Scripts use logical time: each row carries `at`, an offset in seconds from
//! the replay start. A reservation made at `at` with TTL `ttl` expires at
//! `start + at + ttl`, and an `expire` row sweeps with `now = start + at`.
//!
//! # Cancel targets
//!
//! `cancel` rows name the request that created the reservation, not the
//! reservation id (ids are assigned at run time). The replayer remembers which
//! reservation each successful request created. A cancel whose target has not
//! produced a reservation yet reports `not_found`.

use crate::core::traits::Reserver;
use crate::types::{
    AccountId, ReplayResult, Request, RequestId, RequestRecord, Reservation, ReservationId,
    ReserveError,
};
use chrono::{DateTime, Duration as TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for replaying request scripts
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayConfig {
    /// TTL for reservation requests that don't carry their own
    pub default_ttl: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
        }
    }
}

impl ReplayConfig {
    /// Create a config, falling back to the default for a zero TTL
    pub fn new(default_ttl: Duration) -> Self {
        if default_ttl.is_zero() {
            let default = Self::default();
            warn!(
                default_secs = default.default_ttl.as_secs(),
                "Invalid default TTL (0), using default"
            );
            return default;
        }
        Self { default_ttl }
    }
}

/// Applies script rows to a reserver
///
/// Cloneable and shareable across tasks; all state lives behind `Arc`s.
#[derive(Debug)]
pub struct Replayer<R: ?Sized> {
    reserver: Arc<R>,
    start: DateTime<Utc>,
    config: ReplayConfig,
    created: Arc<DashMap<RequestId, ReservationId>>,
}

impl<R: ?Sized> Clone for Replayer<R> {
    fn clone(&self) -> Self {
        Self {
            reserver: Arc::clone(&self.reserver),
            start: self.start,
            config: self.config.clone(),
            created: Arc::clone(&self.created),
        }
    }
}

impl<R: Reserver + ?Sized> Replayer<R> {
    pub fn new(reserver: Arc<R>, start: DateTime<Utc>, config: ReplayConfig) -> Self {
        Self {
            reserver,
            start,
            config,
            created: Arc::new(DashMap::new()),
        }
    }

    /// Wall-clock time of a logical offset, saturating at the far future
    pub fn time_at(&self, offset_secs: u64) -> DateTime<Utc> {
        i64::try_from(offset_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| self.start.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn expiry(&self, at: u64, ttl_secs: Option<u64>) -> DateTime<Utc> {
        let ttl = ttl_secs.unwrap_or(self.config.default_ttl.as_secs());
        self.time_at(at.saturating_add(ttl))
    }

    /// Reservation created by request `id`, if it succeeded
    pub fn reservation_for(&self, id: RequestId) -> Option<ReservationId> {
        self.created.get(&id).map(|entry| *entry.value())
    }

    /// Apply one row and describe what happened
    ///
    /// Never fails: every error is folded into the result's `outcome`.
    pub async fn apply(&self, record: RequestRecord) -> ReplayResult {
        let op = record.request.op();
        match record.request {
            Request::Reserve { source, ttl_secs } => {
                let expiry = self.expiry(record.at, ttl_secs);
                let outcome = self.reserver.reserve(source, expiry).await;
                self.reservation_result(record.id, op, record.account, outcome)
            }
            Request::ReserveUtxo {
                tx_hash,
                index,
                client_token,
                ttl_secs,
            } => {
                let expiry = self.expiry(record.at, ttl_secs);
                let outcome = self
                    .reserver
                    .reserve_utxo(tx_hash, index, client_token, expiry)
                    .await;
                self.reservation_result(record.id, op, record.account, outcome)
            }
            Request::Cancel { target } => match self.reservation_for(target) {
                Some(rid) => match self.reserver.cancel(rid).await {
                    Ok(()) => result(record.id, op, "ok", Some(rid), record.account),
                    Err(e) => {
                        debug!(request = record.id, target, error = %e, "Replay: cancel had no effect");
                        result(record.id, op, e.kind(), None, record.account)
                    }
                },
                None => {
                    debug!(request = record.id, target, "Replay: cancel target holds no reservation");
                    result(record.id, op, "not_found", None, record.account)
                }
            },
            Request::Expire => {
                let now = self.time_at(record.at);
                match self.reserver.expire_reservations(now).await {
                    Ok(()) => result(record.id, op, "ok", None, None),
                    Err(e) => result(record.id, op, e.kind(), None, None),
                }
            }
        }
    }

    fn reservation_result(
        &self,
        id: RequestId,
        op: &'static str,
        account: Option<AccountId>,
        outcome: Result<Reservation, ReserveError>,
    ) -> ReplayResult {
        match outcome {
            Ok(reservation) => {
                self.created.insert(id, reservation.id);
                ReplayResult {
                    id,
                    op,
                    outcome: "ok",
                    reservation: Some(reservation.id),
                    held: Some(reservation.total()),
                    change: Some(reservation.change_total()),
                    account: Some(reservation.account_id),
                }
            }
            Err(e) => {
                debug!(request = id, error = %e, "Replay: request rejected");
                result(id, op, e.kind(), None, account)
            }
        }
    }
}

fn result(
    id: RequestId,
    op: &'static str,
    outcome: &'static str,
    reservation: Option<ReservationId>,
    account: Option<AccountId>,
) -> ReplayResult {
    ReplayResult {
        id,
        op,
        outcome,
        reservation,
        account,
        held: None,
        change: None,
    }
}
