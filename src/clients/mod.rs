//! Typed endpoint clients on top of [`QueryClient`].

pub mod api_client;
pub mod auth_client;
pub mod delivery_client;
pub mod order_client;
pub mod query;

pub use api_client::*;
pub use auth_client::*;
pub use delivery_client::*;
pub use order_client::*;
pub use query::*;
