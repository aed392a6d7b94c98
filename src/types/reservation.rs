//! Reservation-related types
//!
//! This module defines the request (`Source`), the result of a successful
//! reservation (`Reservation`) and the change it carries.

use super::utxo::{AccountId, AssetId, Hash, Utxo};
use chrono::{DateTime, Utc};

/// Reservation identifier
///
/// Drawn from a process-wide atomic counter starting at 1. The counter wraps
/// at `u32::MAX`; ids are assumed never to live long enough for that to
/// collide with a reservation that is still observable.
pub type ReservationId = u32;

/// Caller-supplied idempotency key
pub type ClientToken = String;

/// A reservation request
///
/// Describes what asset, amount and account a reservation should satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Asset to reserve
    pub asset_id: AssetId,

    /// Account to reserve from
    pub account_id: AccountId,

    /// Amount of `asset_id` requested
    pub amount: u64,

    /// Force a particular UTXO: transaction hash
    ///
    /// Only honoured together with `output_index`.
    pub tx_hash: Option<Hash>,

    /// Force a particular UTXO: output index
    pub output_index: Option<u32>,

    /// Idempotency key; calls sharing a token share one reservation attempt
    pub client_token: Option<ClientToken>,
}

impl Source {
    /// Create a source for `amount` of `asset_id` from `account_id`
    pub fn new(asset_id: AssetId, account_id: impl Into<AccountId>, amount: u64) -> Self {
        Self {
            asset_id,
            account_id: account_id.into(),
            amount,
            tx_hash: None,
            output_index: None,
            client_token: None,
        }
    }

    /// Attach a client token for idempotent retries
    pub fn with_client_token(mut self, token: impl Into<ClientToken>) -> Self {
        self.client_token = Some(token.into());
        self
    }

    /// Force the reservation onto a specific outpoint
    pub fn with_outpoint(mut self, tx_hash: Hash, output_index: u32) -> Self {
        self.tx_hash = Some(tx_hash);
        self.output_index = Some(output_index);
        self
    }

    /// The forced outpoint, if both halves are present
    pub fn forced_outpoint(&self) -> Option<(Hash, u32)> {
        self.tx_hash.zip(self.output_index)
    }
}

/// Units reserved beyond what was asked for
///
/// Informational: downstream transaction building turns this into a change
/// output back to `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub source: Source,
    pub amount: u64,
}

/// A successful, live hold on one or more UTXOs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Unique identifier assigned at creation
    pub id: ReservationId,

    /// Account every held UTXO belongs to
    pub account_id: AccountId,

    /// The held UTXOs, in selection order
    pub utxos: Vec<Utxo>,

    /// Amounts reserved beyond the request
    pub change: Vec<Change>,

    /// Time at or after which the sweeper may reclaim this reservation
    pub expiry: DateTime<Utc>,

    /// Token that produced this reservation, if any
    pub client_token: Option<ClientToken>,
}

impl Reservation {
    /// Sum of the amounts of all held UTXOs
    pub fn total(&self) -> u64 {
        self.utxos.iter().map(|u| u.amount).sum()
    }

    /// Sum of all change amounts
    pub fn change_total(&self) -> u64 {
        self.change.iter().map(|c| c.amount).sum()
    }

    /// Whether the reservation's expiry is at or before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outpoint;
    use chrono::Duration;

    fn utxo(amount: u64) -> Utxo {
        Utxo {
            outpoint: Outpoint::new(Hash::new([amount as u8; 32]), 0),
            asset_id: AssetId::new([1; 32]),
            amount,
            account_id: AccountId::new("acc"),
            control_program: vec![],
            control_program_index: 0,
        }
    }

    #[test]
    fn test_forced_outpoint_requires_both_halves() {
        let mut source = Source::new(AssetId::new([1; 32]), "acc", 10);
        assert_eq!(source.forced_outpoint(), None);

        source.tx_hash = Some(Hash::new([2; 32]));
        assert_eq!(source.forced_outpoint(), None);

        let source = source.with_outpoint(Hash::new([2; 32]), 3);
        assert_eq!(source.forced_outpoint(), Some((Hash::new([2; 32]), 3)));
    }

    #[test]
    fn test_reservation_totals_and_expiry_boundary() {
        let now = Utc::now();
        let source = Source::new(AssetId::new([1; 32]), "acc", 25);
        let reservation = Reservation {
            id: 1,
            account_id: AccountId::new("acc"),
            utxos: vec![utxo(10), utxo(20)],
            change: vec![Change { source, amount: 5 }],
            expiry: now,
            client_token: None,
        };

        assert_eq!(reservation.total(), 30);
        assert_eq!(reservation.change_total(), 5);
        assert!(reservation.is_expired(now));
        assert!(reservation.is_expired(now + Duration::seconds(1)));
        assert!(!reservation.is_expired(now - Duration::seconds(1)));
    }
}
