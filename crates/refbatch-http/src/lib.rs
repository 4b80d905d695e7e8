//! refbatch-http: HTTP lookup endpoint for `refbatch-core`.
//!
//! [`HttpLookupClient`] implements [`refbatch_core::BatchLookup`] over a
//! paged REST "find by URI list" endpoint; [`profiles`] builds clients for
//! the competence and occupation endpoints.
//!
//! # Quick start
//! ```rust,no_run
//! use refbatch_core::BatchResolver;
//! use refbatch_http::{profiles, HttpLookupConfig};
//!
//! # async fn run() -> Result<(), refbatch_core::ResolveError> {
//! let client = profiles::competences("https://api.example.org", HttpLookupConfig::default())?;
//! let resolver = BatchResolver::new(client);
//! let labels = resolver
//!     .resolve(
//!         Some(vec!["http://data.europa.eu/esco/skill/abc".to_string()]),
//!         |uri| uri.clone(),
//!         |_uri, skill| skill.preferred_label.clone(),
//!         None,
//!     )
//!     .await?;
//! # let _ = labels;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod profiles;

pub use client::{build_query, HttpLookupClient, HttpLookupConfig};
