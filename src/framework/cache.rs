//! # Query Cache Actor
//!
//! The cache is a single actor task that owns every cached query result.
//! Clients talk to it through [`CacheClient`]; the actor processes one
//! [`CacheRequest`] at a time, so the store needs no lock.
//!
//! ## Protocol
//!
//! 1. `acquire(key)` asks for permission to fetch. If another fetch for the
//!    same key is already running the caller gets [`Lease::Wait`] and simply
//!    awaits that fetch's result (in-flight de-duplication). Otherwise it gets
//!    [`Lease::Fetch`] with a fresh request version.
//! 2. The fetcher runs the request and reports back with `complete`. A
//!    successful value is stored only if its version is not older than the
//!    stored one, so a slow response can never overwrite a newer one.
//!    Errors are handed to waiters but never cached.
//! 3. `invalidate(tags)` marks matching entries stale and broadcasts a
//!    [`CacheEvent`] so pollers refetch right away. A fetch already running
//!    for a matching key is superseded: the next `acquire` starts a new
//!    version instead of joining it, and its own result is stored stale.
//! 4. A fetcher that goes away without completing (its task was aborted)
//!    sends `abandon`. The slot is released and the waiters re-acquire.

use crate::api::ApiError;
use crate::framework::{CacheKey, CacheTag};
use serde_json::Value;
use std::collections::HashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors that can occur when talking to the cache actor.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CacheError {
    #[error("Cache actor closed")]
    ActorClosed,
    #[error("Cache actor dropped response channel")]
    ActorDropped,
}

/// Type alias for the one-shot response channel used by the actor.
pub type Response<T> = oneshot::Sender<T>;

/// Result delivered to callers waiting on someone else's fetch.
pub type FetchResult = Result<Value, ApiError>;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: Value,
    pub version: u64,
    pub stale: bool,
    pub fetched_at: Instant,
}

/// Answer to an `acquire` request.
#[derive(Debug)]
pub enum Lease {
    /// Caller must fetch and then `complete` with this version.
    Fetch { version: u64 },
    /// A fetch is already running; its result arrives here.
    Wait(oneshot::Receiver<FetchResult>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Updated { key: CacheKey },
    Invalidated { keys: Vec<CacheKey>, tags: Vec<CacheTag> },
}

impl CacheEvent {
    /// True if an invalidation touched any of `tags`.
    pub fn invalidates_any(&self, tags: &[CacheTag]) -> bool {
        match self {
            CacheEvent::Invalidated { tags: hit, .. } => hit.iter().any(|t| tags.contains(t)),
            CacheEvent::Updated { .. } => false,
        }
    }
}

/// Internal message type sent to the actor.
#[derive(Debug)]
pub enum CacheRequest {
    Peek {
        key: CacheKey,
        respond_to: Response<Option<CachedValue>>,
    },
    Acquire {
        key: CacheKey,
        tags: Vec<CacheTag>,
        force: bool,
        respond_to: Response<Lease>,
    },
    Complete {
        key: CacheKey,
        version: u64,
        result: FetchResult,
        tags: Vec<CacheTag>,
        respond_to: Response<bool>,
    },
    Invalidate {
        tags: Vec<CacheTag>,
        respond_to: Response<usize>,
    },
    /// The fetcher for `version` went away without completing.
    Abandon {
        key: CacheKey,
        version: u64,
    },
    Evict {
        key: CacheKey,
        respond_to: Response<bool>,
    },
    Len {
        respond_to: Response<usize>,
    },
}

struct Entry {
    value: Value,
    tags: Vec<CacheTag>,
    version: u64,
    stale: bool,
    fetched_at: Instant,
}

struct InFlight {
    version: u64,
    tags: Vec<CacheTag>,
    /// Invalidated while running; its result is already out of date.
    superseded: bool,
    waiters: Vec<oneshot::Sender<FetchResult>>,
}

/// The actor that owns the cache store.
pub struct CacheActor {
    receiver: mpsc::Receiver<CacheRequest>,
    events: broadcast::Sender<CacheEvent>,
    store: HashMap<CacheKey, Entry>,
    in_flight: HashMap<CacheKey, InFlight>,
    next_version: u64,
}

impl CacheActor {
    pub fn new(buffer_size: usize) -> (Self, CacheClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (events, _) = broadcast::channel(64);
        let actor = Self {
            receiver,
            events: events.clone(),
            store: HashMap::new(),
            in_flight: HashMap::new(),
            next_version: 1,
        };
        (actor, CacheClient::new(sender, events))
    }

    /// Runs the actor's event loop until every client is dropped.
    pub async fn run(mut self) {
        info!("Cache actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CacheRequest::Peek { key, respond_to } => {
                    let cached = self.store.get(&key).map(|e| CachedValue {
                        value: e.value.clone(),
                        version: e.version,
                        stale: e.stale,
                        fetched_at: e.fetched_at,
                    });
                    debug!(%key, found = cached.is_some(), "Peek");
                    let _ = respond_to.send(cached);
                }
                CacheRequest::Acquire {
                    key,
                    tags,
                    force,
                    respond_to,
                } => {
                    let lease = self.acquire(&key, tags, force);
                    let _ = respond_to.send(lease);
                }
                CacheRequest::Complete {
                    key,
                    version,
                    result,
                    tags,
                    respond_to,
                } => {
                    let stored = self.complete(key, version, result, tags);
                    let _ = respond_to.send(stored);
                }
                CacheRequest::Invalidate { tags, respond_to } => {
                    let count = self.invalidate(tags);
                    let _ = respond_to.send(count);
                }
                CacheRequest::Abandon { key, version } => {
                    self.abandon(&key, version);
                }
                CacheRequest::Evict { key, respond_to } => {
                    let removed = self.store.remove(&key).is_some();
                    debug!(%key, removed, "Evict");
                    let _ = respond_to.send(removed);
                }
                CacheRequest::Len { respond_to } => {
                    let _ = respond_to.send(self.store.len());
                }
            }
        }

        info!(size = self.store.len(), "Cache actor shutdown");
    }

    fn acquire(&mut self, key: &CacheKey, tags: Vec<CacheTag>, force: bool) -> Lease {
        if let Some(flight) = self.in_flight.get_mut(key) {
            if !force && !flight.superseded {
                let (tx, rx) = oneshot::channel();
                flight.waiters.push(tx);
                debug!(%key, version = flight.version, "Joined in-flight fetch");
                return Lease::Wait(rx);
            }
        }

        let version = self.next_version;
        self.next_version += 1;
        // A forced or post-invalidation fetch takes over the in-flight slot;
        // earlier waiters get the newer result.
        let waiters = self
            .in_flight
            .remove(key)
            .map(|f| f.waiters)
            .unwrap_or_default();
        self.in_flight.insert(
            key.clone(),
            InFlight {
                version,
                tags,
                superseded: false,
                waiters,
            },
        );
        debug!(%key, version, force, "Fetch leased");
        Lease::Fetch { version }
    }

    fn complete(
        &mut self,
        key: CacheKey,
        version: u64,
        result: FetchResult,
        tags: Vec<CacheTag>,
    ) -> bool {
        let mut stored = false;
        // Out of date if an invalidation hit it mid-flight or a newer fetch
        // has taken over the slot.
        let stale = self
            .in_flight
            .get(&key)
            .is_some_and(|f| f.version > version || (f.version == version && f.superseded));
        match &result {
            Ok(value) => {
                let newer = self.store.get(&key).map_or(true, |e| version >= e.version);
                if newer {
                    self.store.insert(
                        key.clone(),
                        Entry {
                            value: value.clone(),
                            tags,
                            version,
                            stale,
                            fetched_at: Instant::now(),
                        },
                    );
                    stored = true;
                    debug!(%key, version, stale, size = self.store.len(), "Stored");
                    let _ = self.events.send(CacheEvent::Updated { key: key.clone() });
                } else {
                    debug!(%key, version, "Discarded out-of-date response");
                }
            }
            Err(e) => warn!(%key, version, error = %e, "Fetch failed"),
        }

        if self.in_flight.get(&key).is_some_and(|f| f.version == version) {
            if let Some(flight) = self.in_flight.remove(&key) {
                for waiter in flight.waiters {
                    let _ = waiter.send(result.clone());
                }
            }
        }
        stored
    }

    fn invalidate(&mut self, tags: Vec<CacheTag>) -> usize {
        let mut keys = Vec::new();
        for (key, entry) in self.store.iter_mut() {
            if entry.tags.iter().any(|t| tags.contains(t)) {
                entry.stale = true;
                keys.push(key.clone());
            }
        }
        let mut superseded = 0;
        for flight in self.in_flight.values_mut() {
            if flight.tags.iter().any(|t| tags.contains(t)) {
                flight.superseded = true;
                superseded += 1;
            }
        }
        info!(tags = ?tags, count = keys.len(), superseded, "Invalidated");
        let count = keys.len();
        let _ = self.events.send(CacheEvent::Invalidated { keys, tags });
        count
    }

    fn abandon(&mut self, key: &CacheKey, version: u64) {
        if self.in_flight.get(key).is_some_and(|f| f.version == version) {
            // Dropping the waiters' senders tells them to re-acquire.
            let waiters = self.in_flight.remove(key).map_or(0, |f| f.waiters.len());
            debug!(%key, version, waiters, "Fetch abandoned");
        }
    }
}

/// A cloneable handle for talking to the [`CacheActor`].
#[derive(Clone)]
pub struct CacheClient {
    sender: mpsc::Sender<CacheRequest>,
    events: broadcast::Sender<CacheEvent>,
}

impl CacheClient {
    pub fn new(sender: mpsc::Sender<CacheRequest>, events: broadcast::Sender<CacheEvent>) -> Self {
        Self { sender, events }
    }

    /// Receives every store and invalidation from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub async fn peek(&self, key: CacheKey) -> Result<Option<CachedValue>, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Peek { key, respond_to })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    /// Asks to fetch `key`. `tags` are the tags the result will carry, so an
    /// invalidation can supersede the fetch while it runs.
    pub async fn acquire(
        &self,
        key: CacheKey,
        tags: Vec<CacheTag>,
        force: bool,
    ) -> Result<Lease, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Acquire {
                key,
                tags,
                force,
                respond_to,
            })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    pub async fn complete(
        &self,
        key: CacheKey,
        version: u64,
        result: FetchResult,
        tags: Vec<CacheTag>,
    ) -> Result<bool, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Complete {
                key,
                version,
                result,
                tags,
                respond_to,
            })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    pub async fn invalidate(&self, tags: Vec<CacheTag>) -> Result<usize, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Invalidate { tags, respond_to })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    /// Releases a fetch lease that will never be completed.
    ///
    /// Callable from `Drop`: it never waits. If the channel is full the
    /// message is sent from a spawned task.
    pub fn abandon(&self, key: CacheKey, version: u64) {
        match self.sender.try_send(CacheRequest::Abandon { key, version }) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(request)) => {
                if let Ok(handle) = Handle::try_current() {
                    let sender = self.sender.clone();
                    handle.spawn(async move {
                        let _ = sender.send(request).await;
                    });
                }
            }
        }
    }

    pub async fn evict(&self, key: CacheKey) -> Result<bool, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Evict { key, respond_to })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    pub async fn len(&self) -> Result<usize, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Len { respond_to })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spawn_cache() -> CacheClient {
        let (actor, client) = CacheActor::new(16);
        tokio::spawn(actor.run());
        client
    }

    fn order_key(id: &str) -> CacheKey {
        CacheKey::new("getOrder", &json!({ "id": id }))
    }

    #[tokio::test]
    async fn second_acquire_waits_for_in_flight_fetch() {
        let cache = spawn_cache();
        let key = order_key("order-1");

        let Lease::Fetch { version } = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!("first acquire must fetch");
        };
        let Lease::Wait(waiter) = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!("second acquire must wait");
        };

        let value = json!({ "status": "placed" });
        let stored = cache
            .complete(key.clone(), version, Ok(value.clone()), vec![CacheTag::Orders])
            .await
            .unwrap();
        assert!(stored);
        assert_eq!(waiter.await.unwrap(), Ok(value.clone()));
        assert_eq!(cache.peek(key).await.unwrap().unwrap().value, value);
    }

    #[tokio::test]
    async fn older_response_never_overwrites_newer() {
        let cache = spawn_cache();
        let key = order_key("order-1");

        let Lease::Fetch { version: old } = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!();
        };
        let Lease::Fetch { version: new } = cache.acquire(key.clone(), vec![], true).await.unwrap() else {
            panic!("forced acquire must fetch");
        };
        assert!(new > old);

        cache
            .complete(key.clone(), new, Ok(json!({ "status": "confirmed" })), vec![])
            .await
            .unwrap();
        let stored = cache
            .complete(key.clone(), old, Ok(json!({ "status": "placed" })), vec![])
            .await
            .unwrap();

        assert!(!stored);
        let cached = cache.peek(key).await.unwrap().unwrap();
        assert_eq!(cached.value["status"], "confirmed");
        assert_eq!(cached.version, new);
    }

    #[tokio::test]
    async fn errors_reach_waiters_but_are_not_cached() {
        let cache = spawn_cache();
        let key = order_key("order-2");

        let Lease::Fetch { version } = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!();
        };
        let Lease::Wait(waiter) = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!();
        };

        let err = ApiError::Network("offline".into());
        cache
            .complete(key.clone(), version, Err(err.clone()), vec![])
            .await
            .unwrap();

        assert_eq!(waiter.await.unwrap(), Err(err));
        assert!(cache.peek(key.clone()).await.unwrap().is_none());
        // The slot is free again.
        assert!(matches!(
            cache.acquire(key, vec![], false).await.unwrap(),
            Lease::Fetch { .. }
        ));
    }

    #[tokio::test]
    async fn invalidate_marks_tagged_entries_and_broadcasts() {
        let cache = spawn_cache();
        let mut events = cache.subscribe();
        let one = order_key("order-1");
        let two = order_key("order-2");

        for (key, id) in [(&one, "order-1"), (&two, "order-2")] {
            let Lease::Fetch { version } = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
                panic!();
            };
            cache
                .complete(key.clone(), version, Ok(json!({})), vec![CacheTag::Order(id.into())])
                .await
                .unwrap();
        }

        let count = cache
            .invalidate(vec![CacheTag::Order("order-1".into())])
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(cache.peek(one.clone()).await.unwrap().unwrap().stale);
        assert!(!cache.peek(two).await.unwrap().unwrap().stale);

        let mut saw_invalidation = false;
        while let Ok(event) = events.try_recv() {
            if let CacheEvent::Invalidated { keys, .. } = &event {
                assert_eq!(keys, &vec![one.clone()]);
                assert!(event.invalidates_any(&[CacheTag::Order("order-1".into())]));
                saw_invalidation = true;
            }
        }
        assert!(saw_invalidation);
    }

    #[tokio::test]
    async fn invalidation_supersedes_in_flight_fetch() {
        let cache = spawn_cache();
        let key = order_key("order-1");
        let tags = vec![CacheTag::Order("order-1".into())];

        let Lease::Fetch { version: before } =
            cache.acquire(key.clone(), tags.clone(), false).await.unwrap()
        else {
            panic!("first acquire must fetch");
        };
        cache.invalidate(tags.clone()).await.unwrap();

        // Joining the running fetch would hand back the pre-invalidation body.
        let Lease::Fetch { version: after } =
            cache.acquire(key.clone(), tags.clone(), false).await.unwrap()
        else {
            panic!("acquire after invalidation must start a new fetch");
        };
        assert!(after > before);

        cache
            .complete(key.clone(), before, Ok(json!({ "status": "placed" })), tags.clone())
            .await
            .unwrap();
        assert!(cache.peek(key.clone()).await.unwrap().unwrap().stale);

        cache
            .complete(key.clone(), after, Ok(json!({ "status": "confirmed" })), tags)
            .await
            .unwrap();
        let cached = cache.peek(key).await.unwrap().unwrap();
        assert!(!cached.stale);
        assert_eq!(cached.value["status"], "confirmed");
    }

    #[tokio::test]
    async fn abandoned_fetch_frees_slot_and_releases_waiters() {
        let cache = spawn_cache();
        let key = order_key("order-3");

        let Lease::Fetch { version } = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!();
        };
        let Lease::Wait(waiter) = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!();
        };

        cache.abandon(key.clone(), version);

        assert!(waiter.await.is_err());
        assert!(matches!(
            cache.acquire(key, vec![], false).await.unwrap(),
            Lease::Fetch { .. }
        ));
    }

    #[tokio::test]
    async fn abandon_of_old_version_keeps_current_fetch() {
        let cache = spawn_cache();
        let key = order_key("order-4");

        let Lease::Fetch { version: old } = cache.acquire(key.clone(), vec![], false).await.unwrap() else {
            panic!();
        };
        let Lease::Fetch { .. } = cache.acquire(key.clone(), vec![], true).await.unwrap() else {
            panic!();
        };

        cache.abandon(key.clone(), old);

        assert!(matches!(
            cache.acquire(key, vec![], false).await.unwrap(),
            Lease::Wait(_)
        ));
    }
}
