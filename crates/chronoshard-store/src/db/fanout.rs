//! Concurrent fan-out over shard collections.
//!
//! One logical cross-shard read dispatches one future per shard through
//! a bounded pool. The first failing shard wins: the merged operation
//! returns its error, pending shard futures are dropped, and partial
//! results are discarded. There is no partial-success mode.

use std::future::Future;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::error::StoreResult;

/// Merge ordering key for fanned-out results: newest first, identifier
/// as the stable tie-break.
pub trait MergeOrder {
    fn created_at(&self) -> DateTime<Utc>;
    fn id(&self) -> Uuid;
}

/// Bounded-concurrency fan-out executor.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    concurrency: usize,
}

impl FanOut {
    /// Default pool width when no configuration is supplied.
    pub const DEFAULT_CONCURRENCY: usize = 8;

    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// ## Summary
    /// Runs one query per shard, at most `concurrency` at a time, and
    /// merges the batches into a single list ordered by
    /// (`created_at` desc, `id` desc).
    ///
    /// ## Errors
    /// Returns the first shard error; in-flight sibling reads are
    /// dropped best-effort and no partial results are surfaced.
    pub async fn run<S, T, F, Fut>(&self, shards: Vec<S>, query: F) -> StoreResult<Vec<T>>
    where
        T: MergeOrder,
        F: Fn(S) -> Fut,
        Fut: Future<Output = StoreResult<Vec<T>>> + Send,
    {
        let mut merged = self.run_unordered(shards, query).await?;
        merged.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(merged)
    }

    /// ## Summary
    /// Like [`FanOut::run`] but leaves the merged list in completion
    /// order, for callers that impose their own ordering downstream.
    ///
    /// ## Errors
    /// Returns the first shard error; partial results are discarded.
    pub async fn run_unordered<S, T, F, Fut>(&self, shards: Vec<S>, query: F) -> StoreResult<Vec<T>>
    where
        F: Fn(S) -> Fut,
        Fut: Future<Output = StoreResult<Vec<T>>> + Send,
    {
        stream::iter(shards.into_iter().map(query))
            .buffer_unordered(self.concurrency)
            .try_fold(Vec::new(), |mut merged, batch| async move {
                merged.extend(batch);
                Ok(merged)
            })
            .await
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CONCURRENCY)
    }
}
