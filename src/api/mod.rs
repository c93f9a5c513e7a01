//! Backend access: request description, the [`Transport`] seam, the
//! Supabase implementation and a mock for tests.

pub mod error;
pub mod mock;
pub mod request;
pub mod session;
pub mod supabase;

pub use error::*;
pub use request::*;
pub use session::*;
pub use supabase::SupabaseTransport;

use async_trait::async_trait;
use serde_json::Value;

/// Executes backend requests.
///
/// Endpoint clients only ever see this trait, so the same client code runs
/// against [`SupabaseTransport`] in production and
/// [`MockTransport`](mock::MockTransport) in tests.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}
