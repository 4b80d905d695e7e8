//! HTTP lookup client backed by `reqwest`.
//!
//! Each batch becomes one `GET` against the lookup endpoint:
//!
//! ```text
//! GET {base}{path}?uri=k1&uri=k2&...&page=0&size=<number of keys>
//! ```
//!
//! and the response is a page object whose `content` holds the entities
//! that matched. There is no retry here; a failed request fails the batch.

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use refbatch_core::config::ResolverConfig;
use refbatch_core::entity::Entity;
use refbatch_core::error::ResolveError;
use refbatch_core::lookup::{BatchLookup, CancelSignal};
use refbatch_core::page::{Page, PageRequest};

/// Configuration for `HttpLookupClient`.
#[derive(Debug, Clone)]
pub struct HttpLookupConfig {
    pub request_timeout: Duration,
    /// Query parameter repeated once per key.
    pub key_param: String,
    /// Page index sent with every request.
    pub page: u32,
    pub bearer_token: Option<String>,
    pub user_agent: String,
}

impl Default for HttpLookupConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            key_param: "uri".into(),
            page: 0,
            bearer_token: None,
            user_agent: concat!("refbatch/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl HttpLookupConfig {
    pub fn from_resolver_config(config: &ResolverConfig) -> Self {
        Self {
            request_timeout: config.timeout(),
            page: config.page,
            bearer_token: config.bearer_token.clone(),
            ..Self::default()
        }
    }
}

/// Query pairs for one lookup request, keys first in request order.
pub fn build_query(key_param: &str, req: &PageRequest) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = req
        .keys
        .iter()
        .map(|k| (key_param.to_string(), k.clone()))
        .collect();
    pairs.push(("page".into(), req.page.to_string()));
    pairs.push(("size".into(), req.size.to_string()));
    pairs
}

/// Paged "find by key list" client for one entity kind.
pub struct HttpLookupClient<D> {
    url: String,
    http: reqwest::Client,
    config: HttpLookupConfig,
    _entity: PhantomData<fn() -> D>,
}

impl<D> HttpLookupClient<D> {
    /// Create a client for `{base_url}{path}`.
    pub fn new(
        base_url: &str,
        path: &str,
        config: HttpLookupConfig,
    ) -> Result<Self, ResolveError> {
        let url = join_url(base_url, path);
        reqwest::Url::parse(&url)
            .map_err(|e| ResolveError::Config(format!("invalid lookup URL {url:?}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ResolveError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url,
            http,
            config,
            _entity: PhantomData,
        })
    }

    pub fn config(&self) -> &HttpLookupConfig {
        &self.config
    }
}

impl<D: DeserializeOwned> HttpLookupClient<D> {
    async fn send_once(&self, req: &PageRequest) -> Result<Vec<D>, ResolveError> {
        let started = Instant::now();
        let mut builder = self
            .http
            .get(&self.url)
            .query(&build_query(&self.config.key_param, req));
        if let Some(token) = &self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await.map_err(|e| self.map_reqwest(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ResolveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        let page: Page<D> = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            url = %self.url,
            requested = req.size,
            returned = page.content.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lookup page received"
        );
        Ok(page.into_content())
    }

    fn map_reqwest(&self, e: reqwest::Error) -> ResolveError {
        if e.is_timeout() {
            ResolveError::Timeout {
                ms: self.config.request_timeout.as_millis() as u64,
            }
        } else {
            ResolveError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl<D> BatchLookup for HttpLookupClient<D>
where
    D: Entity + DeserializeOwned + Send + 'static,
{
    type Entity = D;

    async fn fetch_batch(
        &self,
        keys: Vec<String>,
        cancel: Option<&CancelSignal>,
    ) -> Result<Vec<D>, ResolveError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let req = PageRequest::at_page(keys, self.config.page);

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(url = %self.url, keys = req.size, "lookup cancelled");
                        Err(ResolveError::Cancelled)
                    }
                    result = self.send_once(&req) => result,
                }
            }
            None => self.send_once(&req).await,
        }
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
