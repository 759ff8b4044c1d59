//! Version Storage
//!
//! The physical backend (a column store in production) is external to this
//! crate. `VersionStore` is the contract the pipeline needs from it:
//! conditional writes keyed by (identifier, stamp, status), latest-committed
//! lookup, a bounded window scan, and a point lookup. `InMemoryVersionStore`
//! implements the contract over process-local maps for tests and embedding.
//!
//! Atomicity rule: the conditional operations evaluate their guard and apply
//! their effect as one step with respect to other calls on the same store.
//! That single property is what lets the commit stage serialize concurrent
//! writers without locks in the pipeline itself.

pub mod errors;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::ops::Bound;
use std::pin::Pin;
use std::sync::RwLock;

use uuid::Uuid;

use crate::collection::CollectionScope;
use crate::entity::{EntityId, VersionStamp, VersionStatus, VersionedRecord};

pub use errors::{StoreError, StoreResult};

/// Boxed future returned by store operations. The await on one of these is
/// the pipeline's suspension point.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Contract the pipeline requires from the version storage backend.
pub trait VersionStore: Send + Sync {
    /// Inserts a record if no record exists for its (identifier, stamp)
    /// slot. With `unsuperseded_since`, the insert additionally fails when a
    /// committed version with a stamp greater than the given base already
    /// exists for the identifier. A writer that observed no committed
    /// history passes the unassigned stamp as its base.
    ///
    /// Returns false when the guard rejected the insert.
    fn insert_if_absent<'a>(
        &'a self,
        scope: &'a CollectionScope,
        record: &'a VersionedRecord,
        unsuperseded_since: Option<VersionStamp>,
    ) -> StoreFuture<'a, bool>;

    /// Flips the status of (identifier, stamp) from `from` to `to`. Fails
    /// (Ok(false)) when the record is missing, is not in `from`, or - with
    /// `unsuperseded_since` - when a committed version newer than the given
    /// base exists.
    fn update_status<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        stamp: VersionStamp,
        from: VersionStatus,
        to: VersionStatus,
        unsuperseded_since: Option<VersionStamp>,
    ) -> StoreFuture<'a, bool>;

    /// Returns the committed (Complete or Deleted) record with the largest
    /// stamp for the identifier, optionally bounded from above by `upper`.
    /// Partial records are never returned.
    fn latest_committed<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        upper: Option<VersionStamp>,
    ) -> StoreFuture<'a, Option<VersionedRecord>>;

    /// Returns every record, any status, with `low < stamp < high`, in stamp
    /// order. This is also the scan a reconciliation pass uses to find stale
    /// partials.
    fn versions_between<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        low: VersionStamp,
        high: VersionStamp,
    ) -> StoreFuture<'a, Vec<VersionedRecord>>;

    /// Point lookup of (identifier, stamp).
    fn get<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        stamp: VersionStamp,
    ) -> StoreFuture<'a, Option<VersionedRecord>>;
}

type ChainKey = (Uuid, String, EntityId);
type Chain = BTreeMap<VersionStamp, VersionedRecord>;

/// In-memory version store for tests and embedding.
///
/// All conditional operations run under one write lock, which provides the
/// guard-and-apply atomicity the trait requires.
#[derive(Default)]
pub struct InMemoryVersionStore {
    chains: RwLock<HashMap<ChainKey, Chain>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(scope: &CollectionScope, id: &EntityId) -> ChainKey {
        (scope.owner(), scope.name().to_string(), id.clone())
    }

    fn newest_committed(chain: &Chain, upper: Option<VersionStamp>) -> Option<&VersionedRecord> {
        chain
            .iter()
            .rev()
            .filter(|(stamp, _)| upper.map_or(true, |u| **stamp <= u))
            .map(|(_, record)| record)
            .find(|record| record.status().is_committed())
    }

    // A writer that observed an empty history passes the unassigned stamp
    // as its base; every real stamp is greater, so any commit supersedes it.
    fn superseded(chain: &Chain, base: VersionStamp) -> bool {
        Self::newest_committed(chain, None).map_or(false, |newest| newest.stamp() > base)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn insert_if_absent<'a>(
        &'a self,
        scope: &'a CollectionScope,
        record: &'a VersionedRecord,
        unsuperseded_since: Option<VersionStamp>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut chains = self
                .chains
                .write()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let chain = chains
                .entry(Self::key(scope, record.id()))
                .or_insert_with(BTreeMap::new);

            if chain.contains_key(&record.stamp()) {
                return Ok(false);
            }
            if let Some(base) = unsuperseded_since {
                if Self::superseded(chain, base) {
                    return Ok(false);
                }
            }
            chain.insert(record.stamp(), record.clone());
            Ok(true)
        })
    }

    fn update_status<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        stamp: VersionStamp,
        from: VersionStatus,
        to: VersionStatus,
        unsuperseded_since: Option<VersionStamp>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut chains = self
                .chains
                .write()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let Some(chain) = chains.get_mut(&Self::key(scope, id)) else {
                return Ok(false);
            };

            if let Some(base) = unsuperseded_since {
                if Self::superseded(chain, base) {
                    return Ok(false);
                }
            }
            match chain.get_mut(&stamp) {
                Some(record) if record.status() == from => {
                    *record = record.clone().with_status(to);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn latest_committed<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        upper: Option<VersionStamp>,
    ) -> StoreFuture<'a, Option<VersionedRecord>> {
        Box::pin(async move {
            let chains = self
                .chains
                .read()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Ok(chains
                .get(&Self::key(scope, id))
                .and_then(|chain| Self::newest_committed(chain, upper))
                .cloned())
        })
    }

    fn versions_between<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        low: VersionStamp,
        high: VersionStamp,
    ) -> StoreFuture<'a, Vec<VersionedRecord>> {
        Box::pin(async move {
            let chains = self
                .chains
                .read()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Ok(chains
                .get(&Self::key(scope, id))
                .map(|chain| {
                    chain
                        .range((Bound::Excluded(low), Bound::Excluded(high)))
                        .map(|(_, record)| record.clone())
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn get<'a>(
        &'a self,
        scope: &'a CollectionScope,
        id: &'a EntityId,
        stamp: VersionStamp,
    ) -> StoreFuture<'a, Option<VersionedRecord>> {
        Box::pin(async move {
            let chains = self
                .chains
                .read()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Ok(chains
                .get(&Self::key(scope, id))
                .and_then(|chain| chain.get(&stamp))
                .cloned())
        })
    }
}
