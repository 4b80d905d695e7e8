//! Endpoint profiles for the two entity kinds.
//!
//! Both kinds share the same paged lookup contract and differ only in the
//! path they are served from.

use refbatch_core::entity::{Competence, Occupation};
use refbatch_core::error::ResolveError;

use crate::client::{HttpLookupClient, HttpLookupConfig};

pub const COMPETENCES_PATH: &str = "/competences";
pub const OCCUPATIONS_PATH: &str = "/occupations";

/// Competence lookup client rooted at `base_url`.
pub fn competences(
    base_url: &str,
    config: HttpLookupConfig,
) -> Result<HttpLookupClient<Competence>, ResolveError> {
    HttpLookupClient::new(base_url, COMPETENCES_PATH, config)
}

/// Occupation lookup client rooted at `base_url`.
pub fn occupations(
    base_url: &str,
    config: HttpLookupConfig,
) -> Result<HttpLookupClient<Occupation>, ResolveError> {
    HttpLookupClient::new(base_url, OCCUPATIONS_PATH, config)
}
