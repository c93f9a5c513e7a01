use crate::api::ApiError;
use crate::clients::QueryClient;
use crate::framework::{CacheError, CacheTag};
use async_trait::async_trait;

/// Trait for endpoint clients built on a shared [`QueryClient`].
///
/// Provides the cache operations every endpoint client needs so that each
/// one only has to describe its own queries and mutations.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// The endpoint-specific error type.
    type Error: From<ApiError> + From<CacheError> + Send;

    /// Access the shared query client.
    fn query_client(&self) -> &QueryClient;

    /// Marks every entry carrying one of `tags` stale.
    #[tracing::instrument(skip(self))]
    async fn invalidate(&self, tags: Vec<CacheTag>) -> Result<usize, Self::Error> {
        tracing::debug!("Sending invalidation");
        Ok(self.query_client().cache().invalidate(tags).await?)
    }
}
