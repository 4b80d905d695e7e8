//! `BatchResolver`: deduplicate, partition, fan out, reassemble.
//!
//! One resolve call:
//! 1. scans the source objects once, extracting and caching each key;
//! 2. assigns every distinct key, in first-seen order, to a length-bounded batch;
//! 3. dispatches all batches concurrently and fails if any batch fails;
//! 4. merges every returned entity into a `uri -> entity` map;
//! 5. walks the source objects again, in their original order, and combines
//!    each one whose key resolved. Objects whose key did not resolve are
//!    skipped.
//!
//! Nothing is shared between calls: two overlapping resolves each perform
//! their own lookups.

use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::budget::{BatchBudget, Partitioner};
use crate::entity::Entity;
use crate::error::ResolveError;
use crate::lookup::{BatchLookup, CancelSignal};

/// Output of [`BatchResolver::resolve_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<R> {
    /// Combined results, in source order.
    pub results: Vec<R>,
    /// Distinct keys that no batch returned, in first-seen order.
    pub unresolved: Vec<String>,
    /// Number of lookup requests issued.
    pub batches: usize,
}

/// Source objects paired with their extracted keys, plus the planned batches.
struct Scan<T> {
    keyed: Vec<(String, T)>,
    batches: Vec<Vec<String>>,
}

/// Resolves URI references held by caller objects through one lookup endpoint.
pub struct BatchResolver<L> {
    lookup: L,
    budget: BatchBudget,
}

impl<L: BatchLookup> BatchResolver<L> {
    /// Create a resolver with the default 4096-byte batch budget.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            budget: BatchBudget::default(),
        }
    }

    pub fn with_budget(lookup: L, budget: BatchBudget) -> Result<Self, ResolveError> {
        budget.validate()?;
        Ok(Self { lookup, budget })
    }

    pub fn budget(&self) -> BatchBudget {
        self.budget
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Deduplicate `keys` (first occurrence wins) and partition them into
    /// the batches a resolve call would dispatch. Performs no I/O.
    pub fn plan<I, S>(&self, keys: I) -> Vec<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut partitioner = Partitioner::new(self.budget);
        for key in keys {
            let key = key.into();
            if seen.insert(key.clone()) {
                partitioner.push(key);
            }
        }
        partitioner.finish()
    }

    /// Resolve every object's reference and combine it with its entity.
    ///
    /// `None` (or an empty iterator) yields an empty result without any
    /// lookup. The output keeps the relative order of `objects`; objects
    /// whose key did not resolve are omitted. Any failed batch fails the
    /// whole call.
    pub async fn resolve<T, R, I, K, C>(
        &self,
        objects: Option<I>,
        key: K,
        mut combine: C,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<R>, ResolveError>
    where
        I: IntoIterator<Item = T>,
        K: FnMut(&T) -> String,
        C: FnMut(T, &L::Entity) -> R,
    {
        self.try_resolve(objects, key, |obj, entity| Ok(combine(obj, entity)), cancel)
            .await
    }

    /// Like [`resolve`](Self::resolve), with a fallible combiner. The first
    /// combiner error aborts the call and is returned as-is.
    pub async fn try_resolve<T, R, E, I, K, C>(
        &self,
        objects: Option<I>,
        key: K,
        combine: C,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<R>, E>
    where
        I: IntoIterator<Item = T>,
        K: FnMut(&T) -> String,
        C: FnMut(T, &L::Entity) -> Result<R, E>,
        E: From<ResolveError>,
    {
        let Some(objects) = objects else {
            return Ok(Vec::new());
        };
        let scan = self.scan(objects, key);
        let resolved = self.fetch_all(scan.batches, cancel).await?;
        assemble(scan.keyed, &resolved, combine)
    }

    /// Like [`resolve`](Self::resolve), but also reports which distinct
    /// keys went unresolved and how many batches were sent.
    pub async fn resolve_detailed<T, R, I, K, C>(
        &self,
        objects: Option<I>,
        key: K,
        mut combine: C,
        cancel: Option<&CancelSignal>,
    ) -> Result<Resolution<R>, ResolveError>
    where
        I: IntoIterator<Item = T>,
        K: FnMut(&T) -> String,
        C: FnMut(T, &L::Entity) -> R,
    {
        self.try_resolve_detailed(objects, key, |obj, entity| Ok(combine(obj, entity)), cancel)
            .await
    }

    /// [`resolve_detailed`](Self::resolve_detailed) with a fallible
    /// combiner. The first combiner error aborts the call.
    pub async fn try_resolve_detailed<T, R, E, I, K, C>(
        &self,
        objects: Option<I>,
        key: K,
        combine: C,
        cancel: Option<&CancelSignal>,
    ) -> Result<Resolution<R>, E>
    where
        I: IntoIterator<Item = T>,
        K: FnMut(&T) -> String,
        C: FnMut(T, &L::Entity) -> Result<R, E>,
        E: From<ResolveError>,
    {
        let Some(objects) = objects else {
            return Ok(Resolution {
                results: Vec::new(),
                unresolved: Vec::new(),
                batches: 0,
            });
        };
        let scan = self.scan(objects, key);
        let batches = scan.batches.len();
        let distinct: Vec<String> = scan.batches.iter().flatten().cloned().collect();

        let resolved = self.fetch_all(scan.batches, cancel).await?;
        let unresolved = distinct
            .into_iter()
            .filter(|k| !resolved.contains_key(k))
            .collect();
        let results = assemble(scan.keyed, &resolved, combine)?;

        Ok(Resolution {
            results,
            unresolved,
            batches,
        })
    }

    fn scan<T, I, K>(&self, objects: I, mut key: K) -> Scan<T>
    where
        I: IntoIterator<Item = T>,
        K: FnMut(&T) -> String,
    {
        let mut seen = HashSet::new();
        let mut partitioner = Partitioner::new(self.budget);
        let keyed: Vec<(String, T)> = objects
            .into_iter()
            .map(|obj| {
                let k = key(&obj);
                if seen.insert(k.clone()) {
                    partitioner.push(k.clone());
                }
                (k, obj)
            })
            .collect();

        Scan {
            keyed,
            batches: partitioner.finish(),
        }
    }

    /// Dispatch every batch at once and merge the responses by entity URI.
    async fn fetch_all(
        &self,
        batches: Vec<Vec<String>>,
        cancel: Option<&CancelSignal>,
    ) -> Result<HashMap<String, L::Entity>, ResolveError> {
        if batches.is_empty() {
            return Ok(HashMap::new());
        }

        let endpoint = self.lookup.endpoint();
        let batch_count = batches.len();
        let requests = batches.into_iter().enumerate().map(|(idx, keys)| {
            let key_count = keys.len();
            let encoded_len = self.budget.encoded_len(&keys);
            async move {
                debug!(endpoint, batch = idx, key_count, encoded_len, "dispatching lookup batch");
                self.lookup.fetch_batch(keys, cancel).await.map_err(|e| {
                    warn!(endpoint, batch = idx, error = %e, "lookup batch failed");
                    e
                })
            }
        });
        let pages = try_join_all(requests).await?;

        let mut resolved = HashMap::new();
        let mut anonymous = 0usize;
        for entity in pages.into_iter().flatten() {
            let uri = entity.uri();
            if uri.is_empty() {
                // an entity without a uri cannot match any key
                anonymous += 1;
                continue;
            }
            resolved.insert(uri.to_owned(), entity);
        }
        if anonymous > 0 {
            warn!(endpoint, dropped = anonymous, "lookup returned entities without a uri");
        }

        debug!(
            endpoint,
            batches = batch_count,
            resolved = resolved.len(),
            "lookup batches complete"
        );
        Ok(resolved)
    }
}

/// Walk the source objects in order, combining each one whose key resolved.
fn assemble<T, D, R, E, C>(
    keyed: Vec<(String, T)>,
    resolved: &HashMap<String, D>,
    mut combine: C,
) -> Result<Vec<R>, E>
where
    C: FnMut(T, &D) -> Result<R, E>,
{
    let mut out = Vec::with_capacity(keyed.len());
    for (key, obj) in keyed {
        if let Some(entity) = resolved.get(&key) {
            out.push(combine(obj, entity)?);
        }
    }
    Ok(out)
}
