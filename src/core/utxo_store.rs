//! Thread-safe in-memory UTXO store
//!
//! This module provides `MemoryUtxoStore`, an implementation of [`UtxoStore`]
//! backed by a `DashMap` keyed by outpoint. It stands in for the relational
//! `account_utxos` table in the replay binary, tests and benchmarks.
//!
//! # Thread Safety
//!
//! All operations are thread-safe through DashMap's internal sharding. A
//! query is not a snapshot: outputs inserted or removed while a query runs
//! may or may not be observed, which matches the eventually-consistent view
//! the reserver expects from its store.

use crate::core::traits::UtxoStore;
use crate::types::{AccountId, AssetId, Hash, Outpoint, ReserveError, Utxo};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory source of truth for confirmed, unspent outputs
#[derive(Debug, Default)]
pub struct MemoryUtxoStore {
    /// Unspent outputs by outpoint
    utxos: DashMap<Outpoint, Utxo>,
}

impl MemoryUtxoStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            utxos: DashMap::new(),
        }
    }

    /// Build a store from an iterator of outputs
    ///
    /// If two outputs share an outpoint, the first one wins.
    pub fn from_utxos(utxos: impl IntoIterator<Item = Utxo>) -> Self {
        let store = Self::new();
        for utxo in utxos {
            store.insert(utxo);
        }
        store
    }

    /// Record a newly confirmed output
    ///
    /// Returns `false` (and leaves the store unchanged) if the outpoint is
    /// already present.
    pub fn insert(&self, utxo: Utxo) -> bool {
        let mut inserted = false;
        self.utxos.entry(utxo.outpoint).or_insert_with(|| {
            inserted = true;
            utxo
        });
        inserted
    }

    /// Remove an output, e.g. because a confirmed block spent it
    pub fn remove(&self, outpoint: &Outpoint) -> Option<Utxo> {
        self.utxos.remove(outpoint).map(|(_, utxo)| utxo)
    }

    /// Look up a single output
    pub fn get(&self, outpoint: &Outpoint) -> Option<Utxo> {
        self.utxos.get(outpoint).map(|entry| entry.value().clone())
    }

    /// Number of unspent outputs in the store
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

#[async_trait]
impl UtxoStore for MemoryUtxoStore {
    async fn find_candidates(
        &self,
        account_id: &AccountId,
        asset_id: &AssetId,
    ) -> Result<Vec<Utxo>, ReserveError> {
        let mut candidates: Vec<Utxo> = self
            .utxos
            .iter()
            .filter(|entry| &entry.account_id == account_id && &entry.asset_id == asset_id)
            .map(|entry| entry.value().clone())
            .collect();

        // Ties are broken by outpoint so selection is deterministic.
        candidates.sort_by(|a, b| a.amount.cmp(&b.amount).then(a.outpoint.cmp(&b.outpoint)));
        Ok(candidates)
    }

    async fn find_specific(&self, tx_hash: &Hash, index: u32) -> Result<Option<Utxo>, ReserveError> {
        Ok(self.get(&Outpoint::new(*tx_hash, index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(seed: u8, account: &str, asset: u8, amount: u64) -> Utxo {
        Utxo {
            outpoint: Outpoint::new(Hash::new([seed; 32]), seed as u32),
            asset_id: AssetId::new([asset; 32]),
            amount,
            account_id: AccountId::new(account),
            control_program: vec![seed],
            control_program_index: seed as u64,
        }
    }

    #[tokio::test]
    async fn test_find_candidates_filters_and_sorts_ascending() {
        let store = MemoryUtxoStore::from_utxos(vec![
            utxo(1, "alice", 1, 100),
            utxo(2, "alice", 1, 10),
            utxo(3, "alice", 2, 5),
            utxo(4, "bob", 1, 1),
            utxo(5, "alice", 1, 20),
        ]);

        let candidates = store
            .find_candidates(&AccountId::new("alice"), &AssetId::new([1; 32]))
            .await
            .unwrap();

        let amounts: Vec<u64> = candidates.iter().map(|u| u.amount).collect();
        assert_eq!(amounts, vec![10, 20, 100]);
        assert!(candidates.iter().all(|u| u.account_id.as_str() == "alice"));
    }

    #[tokio::test]
    async fn test_find_candidates_empty_for_unknown_pair() {
        let store = MemoryUtxoStore::from_utxos(vec![utxo(1, "alice", 1, 100)]);

        let candidates = store
            .find_candidates(&AccountId::new("alice"), &AssetId::new([9; 32]))
            .await
            .unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_find_specific_and_remove() {
        let store = MemoryUtxoStore::new();
        let u = utxo(7, "alice", 1, 42);
        assert!(store.insert(u.clone()));
        assert!(!store.insert(u.clone()));

        let found = store.find_specific(&u.outpoint.hash, 7).await.unwrap();
        assert_eq!(found, Some(u.clone()));

        let missing = store.find_specific(&u.outpoint.hash, 8).await.unwrap();
        assert_eq!(missing, None);

        assert_eq!(store.remove(&u.outpoint), Some(u.clone()));
        assert!(store.is_empty());
        assert_eq!(store.find_specific(&u.outpoint.hash, 7).await.unwrap(), None);
    }
}
