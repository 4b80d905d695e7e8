//! refbatch-core: batch resolution of URI references.
//!
//! # Overview
//!
//! Callers often hold objects that point at external entities only by URI
//! (a job referencing an occupation, a profile referencing competences).
//! This crate fetches those entities from a paged "find by key list"
//! endpoint without issuing one request per reference and without
//! exceeding a URL length limit:
//!
//! - [`BatchResolver`]: dedup, budget-bounded batching, concurrent
//!   dispatch and order-preserving reassembly
//! - [`BatchLookup`]: the async trait every lookup endpoint implements
//! - [`BatchBudget`]: the greedy length-budget partitioner
//! - [`Competence`] / [`Occupation`]: the two entity kinds, plus [`Page`]
//! - [`ResolveError`]: structured error type
//! - [`ResolverConfig`]: JSON + environment configuration

pub mod budget;
pub mod config;
pub mod entity;
pub mod error;
pub mod kinds;
pub mod lookup;
pub mod page;
pub mod resolver;

pub use budget::{BatchBudget, Partitioner};
pub use config::ResolverConfig;
pub use entity::{Competence, Entity, Occupation};
pub use error::ResolveError;
pub use kinds::{resolve_competences, resolve_occupations};
pub use lookup::{BatchLookup, CancelSignal, FnLookup};
pub use page::{Page, PageRequest};
pub use resolver::{BatchResolver, Resolution};
