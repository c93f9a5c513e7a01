//! # Query Client
//!
//! Couples a [`Transport`] with the query cache. Endpoint clients describe
//! *what* to fetch as a [`Query`]; this type decides whether the cache can
//! answer, joins an in-flight fetch, or goes to the backend.
//!
//! Mutations are never applied optimistically: [`QueryClient::mutate`] waits
//! for the backend, and only a successful response invalidates tags.
//!
//! A query may be dropped at any await point (a poll task is aborted when its
//! view goes away). The fetch lease is held in a guard that hands the slot
//! back to the cache in that case, and callers that were waiting on it take
//! over the fetch.

use crate::api::{ApiError, ApiRequest, Transport};
use crate::framework::{CacheClient, CacheError, CacheKey, CacheTag, Lease};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A cacheable read: where to store it, what it provides, how to fetch it.
#[derive(Debug, Clone)]
pub struct Query {
    pub key: CacheKey,
    pub tags: Vec<CacheTag>,
    pub request: ApiRequest,
}

#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    cache: CacheClient,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn Transport>, cache: CacheClient) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Runs a query. A fresh cached value is returned unless `force` is set.
    #[instrument(skip(self, query), fields(key = %query.key))]
    pub async fn query<T, E>(&self, query: Query, force: bool) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: From<ApiError> + From<CacheError>,
    {
        if !force {
            if let Some(cached) = self.cache.peek(query.key.clone()).await? {
                if !cached.stale {
                    debug!(version = cached.version, "Cache hit");
                    return Ok(decode(cached.value)?);
                }
            }
        }

        let Query { key, tags, request } = query;
        let value = loop {
            match self.cache.acquire(key.clone(), tags.clone(), force).await? {
                Lease::Fetch { version } => {
                    debug!(version, "Fetching");
                    let mut lease = LeaseGuard::new(self.cache.clone(), key.clone(), version);
                    let result = self.transport.send(request).await;
                    self.cache.complete(key, version, result.clone(), tags).await?;
                    lease.release();
                    break result?;
                }
                Lease::Wait(waiter) => {
                    debug!("Waiting on in-flight fetch");
                    match waiter.await {
                        Ok(result) => break result?,
                        Err(_) => debug!("In-flight fetch abandoned, acquiring again"),
                    }
                }
            }
        };
        Ok(decode(value)?)
    }

    /// Returns whatever is cached for `key`, stale or not, without fetching.
    pub async fn cached<T, E>(&self, key: CacheKey) -> Result<Option<T>, E>
    where
        T: DeserializeOwned,
        E: From<ApiError> + From<CacheError>,
    {
        match self.cache.peek(key).await? {
            Some(cached) => Ok(Some(decode(cached.value)?)),
            None => Ok(None),
        }
    }

    /// Sends a write and, once it succeeds, invalidates `invalidates`.
    #[instrument(skip(self, request), fields(request = %request))]
    pub async fn mutate<T, E>(&self, request: ApiRequest, invalidates: Vec<CacheTag>) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: From<ApiError> + From<CacheError>,
    {
        let value = self.transport.send(request).await?;
        if !invalidates.is_empty() {
            self.cache.invalidate(invalidates).await?;
        }
        Ok(decode(value)?)
    }
}

/// Returns an unfinished fetch lease to the cache when dropped.
struct LeaseGuard {
    cache: CacheClient,
    key: CacheKey,
    version: u64,
    armed: bool,
}

impl LeaseGuard {
    fn new(cache: CacheClient, key: CacheKey, version: u64) -> Self {
        Self {
            cache,
            key,
            version,
            armed: true,
        }
    }

    /// The lease was completed normally.
    fn release(&mut self) {
        self.armed = false;
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(key = %self.key, version = self.version, "Fetch dropped before completing");
            self.cache.abandon(self.key.clone(), self.version);
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(ApiError::from)
}
