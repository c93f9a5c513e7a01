//! Runtime orchestration and lifecycle management.
//!
//! # Main Components
//!
//! - [`DeliverySystem`] - starts the cache actor and the location reporter and
//!   wires every client onto them
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod system;
pub mod tracing;

pub use system::*;
pub use tracing::*;
