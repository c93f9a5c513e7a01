//! # Mock Cache
//!
//! Utilities for testing clients against the cache protocol in isolation.
//!
//! Use [`create_mock_cache`] to get a [`CacheClient`] and the receiver end of
//! its channel. The test then plays the actor: it pulls each request with
//! one of the `expect_*` helpers, asserts on it and answers through the
//! returned responder. This makes it easy to check, for example, that a
//! mutation invalidates exactly the right tags.

use crate::framework::{
    CacheClient, CacheKey, CacheRequest, CacheTag, CachedValue, FetchResult, Lease,
};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Creates a cache client whose requests land in the returned receiver.
pub fn create_mock_cache(buffer_size: usize) -> (CacheClient, mpsc::Receiver<CacheRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let (events, _) = broadcast::channel(16);
    (CacheClient::new(sender, events), receiver)
}

/// Helper to verify that the next message is a Peek request
pub async fn expect_peek(
    receiver: &mut mpsc::Receiver<CacheRequest>,
) -> Option<(CacheKey, oneshot::Sender<Option<CachedValue>>)> {
    match receiver.recv().await {
        Some(CacheRequest::Peek { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Acquire request
pub async fn expect_acquire(
    receiver: &mut mpsc::Receiver<CacheRequest>,
) -> Option<(CacheKey, Vec<CacheTag>, bool, oneshot::Sender<Lease>)> {
    match receiver.recv().await {
        Some(CacheRequest::Acquire {
            key,
            tags,
            force,
            respond_to,
        }) => Some((key, tags, force, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Complete request
pub async fn expect_complete(
    receiver: &mut mpsc::Receiver<CacheRequest>,
) -> Option<(CacheKey, u64, FetchResult, Vec<CacheTag>, oneshot::Sender<bool>)> {
    match receiver.recv().await {
        Some(CacheRequest::Complete {
            key,
            version,
            result,
            tags,
            respond_to,
        }) => Some((key, version, result, tags, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Abandon notice
pub async fn expect_abandon(receiver: &mut mpsc::Receiver<CacheRequest>) -> Option<(CacheKey, u64)> {
    match receiver.recv().await {
        Some(CacheRequest::Abandon { key, version }) => Some((key, version)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Invalidate request
pub async fn expect_invalidate(
    receiver: &mut mpsc::Receiver<CacheRequest>,
) -> Option<(Vec<CacheTag>, oneshot::Sender<usize>)> {
    match receiver.recv().await {
        Some(CacheRequest::Invalidate { tags, respond_to }) => Some((tags, respond_to)),
        _ => None,
    }
}
