//! Periodic refetch for order views.
//!
//! The backend does not push row changes, so views poll: 10 s for an order
//! detail, 15 s for lists and tracking. Push notifications shorten the wait
//! by invalidating cache tags, which wakes the matching poll tasks early.

pub mod policy;
pub mod registry;
pub mod watch;

pub use policy::*;
pub use registry::*;
pub use watch::*;
