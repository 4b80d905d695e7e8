//! Per-kind entry points. Both go through the one generic [`BatchResolver`].

use crate::entity::{Competence, Occupation};
use crate::error::ResolveError;
use crate::lookup::{BatchLookup, CancelSignal};
use crate::resolver::BatchResolver;

/// Resolve competence references held by `objects`.
pub async fn resolve_competences<L, T, R, I, K, C>(
    lookup: &L,
    objects: Option<I>,
    key: K,
    combine: C,
    cancel: Option<&CancelSignal>,
) -> Result<Vec<R>, ResolveError>
where
    L: BatchLookup<Entity = Competence>,
    I: IntoIterator<Item = T>,
    K: FnMut(&T) -> String,
    C: FnMut(T, &Competence) -> R,
{
    BatchResolver::new(lookup)
        .resolve(objects, key, combine, cancel)
        .await
}

/// Resolve occupation references held by `objects`.
pub async fn resolve_occupations<L, T, R, I, K, C>(
    lookup: &L,
    objects: Option<I>,
    key: K,
    combine: C,
    cancel: Option<&CancelSignal>,
) -> Result<Vec<R>, ResolveError>
where
    L: BatchLookup<Entity = Occupation>,
    I: IntoIterator<Item = T>,
    K: FnMut(&T) -> String,
    C: FnMut(T, &Occupation) -> R,
{
    BatchResolver::new(lookup)
        .resolve(objects, key, combine, cancel)
        .await
}
