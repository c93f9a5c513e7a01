//! Tagged query cache, run as an actor.
//!
//! # Main Components
//!
//! - [`CacheActor`] - owns the store, de-duplicates in-flight fetches and
//!   applies tag invalidation
//! - [`CacheClient`] - cloneable handle used by endpoint clients and pollers
//! - [`CacheKey`] / [`CacheTag`] - `(endpoint, args)` keys and invalidation labels
//!
//! # Testing
//!
//! See [`mock`] for helpers that let a test play the actor's side of the channel.

pub mod cache;
pub mod mock;
pub mod tags;

pub use cache::*;
pub use tags::*;
