//! Batch replay with account-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which replays batches of
//! script rows concurrently while keeping each account's requests in file order.
//!
//! # Design
//!
//! Rows are partitioned by their `account` column. Each partition runs on its
//! own tokio task and applies its rows sequentially, so requests for different
//! accounts race for nothing but the reserver's own locks. Rows without an
//! account share one partition.
//!
//! `expire` rows are not partitioned: they sweep every account, so each one
//! waits for the rows before it and holds back the rows after it.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Replayer<R>  (shared reserver + request-to-reservation map)
//! ```

use std::collections::HashMap;

use tracing::error;

use super::replay::Replayer;
use super::traits::Reserver;
use crate::types::{AccountId, ReplayResult, Request, RequestRecord};

/// Batch processor with account-based partitioning
///
/// Cloneable; clones share the same replayer state.
pub struct BatchProcessor<R: ?Sized> {
    replayer: Replayer<R>,
}

impl<R: ?Sized> Clone for BatchProcessor<R> {
    fn clone(&self) -> Self {
        Self {
            replayer: self.replayer.clone(),
        }
    }
}

impl<R: Reserver + ?Sized + 'static> BatchProcessor<R> {
    pub fn new(replayer: Replayer<R>) -> Self {
        Self { replayer }
    }

    /// Split rows into per-account partitions
    ///
    /// # Guarantees
    ///
    /// - Each row appears in exactly one partition
    /// - Rows within a partition keep their original order
    pub fn partition_by_account(
        &self,
        records: Vec<RequestRecord>,
    ) -> HashMap<Option<AccountId>, Vec<RequestRecord>> {
        let mut partitions: HashMap<Option<AccountId>, Vec<RequestRecord>> = HashMap::new();

        for record in records {
            partitions
                .entry(record.account.clone())
                .or_default()
                .push(record);
        }

        partitions
    }

    /// Apply one partition's rows in order
    pub async fn process_partition(&self, records: Vec<RequestRecord>) -> Vec<ReplayResult> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(self.replayer.apply(record).await);
        }
        results
    }

    /// Run a run of non-expire rows, one tokio task per account
    async fn process_segment(&self, segment: Vec<RequestRecord>) -> Vec<ReplayResult> {
        let mut tasks = Vec::new();
        for (_account, records) in self.partition_by_account(segment) {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_partition(records).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(partition_results) => results.extend(partition_results),
                Err(e) => error!(error = %e, "Replay partition task failed"),
            }
        }
        results
    }

    /// Replay a batch and return one result per row
    ///
    /// `expire` rows are barriers: every earlier row of the batch finishes
    /// before the sweep, and no later row starts until it is done. Results are
    /// not in file order; callers sort by request id.
    pub async fn process_batch(&self, batch: Vec<RequestRecord>) -> Vec<ReplayResult> {
        let mut results = Vec::with_capacity(batch.len());
        let mut segment = Vec::new();

        for record in batch {
            if matches!(record.request, Request::Expire) {
                results.extend(self.process_segment(std::mem::take(&mut segment)).await);
                results.push(self.replayer.apply(record).await);
            } else {
                segment.push(record);
            }
        }

        results.extend(self.process_segment(segment).await);
        results
    }
}
