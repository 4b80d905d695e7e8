//! The `BatchLookup` trait: the injected "find by key list" operation.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::ResolveError;

/// Cooperative cancellation token threaded to every batch request.
pub type CancelSignal = tokio_util::sync::CancellationToken;

/// Looks up a list of reference keys in one request.
///
/// Implementations may return fewer entities than keys requested and in any
/// order. Honouring `cancel` is the implementation's job; the resolver
/// only forwards it.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so batches can be dispatched
/// concurrently from one resolver.
#[async_trait]
pub trait BatchLookup: Send + Sync {
    /// The record type this endpoint returns.
    type Entity: Entity + Send + 'static;

    /// Fetch the entities for `keys`.
    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<Self::Entity>, ResolveError>;

    /// Identifier of the endpoint (URL or name), used in logs.
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<L: BatchLookup + ?Sized> BatchLookup for Arc<L> {
    type Entity = L::Entity;

    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<Self::Entity>, ResolveError> {
        (**self).fetch_batch(keys, cancel).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

#[async_trait]
impl<'a, L: BatchLookup + ?Sized> BatchLookup for &'a L {
    type Entity = L::Entity;

    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<Self::Entity>, ResolveError> {
        (**self).fetch_batch(keys, cancel).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// Adapts an async closure into a [`BatchLookup`].
///
/// The closure receives the batch keys and a clone of the caller's signal.
///
/// ```rust
/// use refbatch_core::{CancelSignal, FnLookup, ResolveError};
///
/// let lookup: FnLookup<_, serde_json::Value> = FnLookup::new("static", |keys: Vec<String>, _cancel: Option<CancelSignal>| async move {
///     Ok::<_, ResolveError>(
///         keys.into_iter()
///             .map(|uri| serde_json::json!({ "uri": uri }))
///             .collect::<Vec<_>>(),
///     )
/// });
/// assert_eq!(refbatch_core::BatchLookup::endpoint(&lookup), "static");
/// ```
pub struct FnLookup<F, D> {
    name: String,
    f: F,
    _entity: PhantomData<fn() -> D>,
}

impl<F, D> FnLookup<F, D> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, D> BatchLookup for FnLookup<F, D>
where
    F: Fn(Vec<String>, Option<CancelSignal>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<D>, ResolveError>> + Send + 'static,
    D: Entity + Send + 'static,
{
    type Entity = D;

    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<D>, ResolveError> {
        (self.f)(keys, cancel.cloned()).await
    }

    fn endpoint(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn echo() -> impl BatchLookup<Entity = Value> {
        FnLookup::new("echo", |keys: Vec<String>, _cancel: Option<CancelSignal>| async move {
            Ok::<_, ResolveError>(keys.into_iter().map(|k| json!({ "uri": k })).collect::<Vec<Value>>())
        })
    }

    #[tokio::test]
    async fn fn_lookup_forwards_keys() {
        let lookup = echo();
        let out = lookup.fetch_batch(vec!["a".into(), "b".into()], None).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["uri"], "b");
        assert_eq!(lookup.endpoint(), "echo");
    }

    #[tokio::test]
    async fn fn_lookup_receives_signal() {
        let lookup = FnLookup::new("cancel-aware", |_keys: Vec<String>, cancel: Option<CancelSignal>| async move {
            match cancel {
                Some(token) if token.is_cancelled() => Err(ResolveError::Cancelled),
                _ => Ok(Vec::<Value>::new()),
            }
        });
        let token = CancelSignal::new();
        token.cancel();
        let err = lookup.fetch_batch(vec!["a".into()], Some(&token)).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn arc_and_ref_delegate() {
        let shared: Arc<dyn BatchLookup<Entity = Value>> = Arc::new(echo());
        assert_eq!(shared.endpoint(), "echo");
        let by_ref = &shared;
        let out = by_ref.fetch_batch(vec!["x".into()], None).await.unwrap();
        assert_eq!(out[0]["uri"], "x");
    }
}
