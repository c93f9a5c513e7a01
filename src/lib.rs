//! # delivery-sync
//!
//! > **Order status and delivery tracking for a grocery delivery app.**
//!
//! This crate is the client-side coordination layer between three kinds of
//! users (customers, admins and delivery staff) and a Supabase backend. The
//! backend owns all data and enforces every rule; this crate decides what a
//! user may ask for, keeps cached copies fresh, and streams the delivery
//! person's location.
//!
//! ## 🏗️ Design
//!
//! ### Order lifecycle
//! ```text
//! placed → confirmed | cancelled
//! confirmed → out_for_delivery (dispatch)
//! out_for_delivery → delivered | delivery_failed
//! ```
//! [`workflow::STATUS_ACTIONS`] lists which role may trigger what; the
//! clients check it before sending anything.
//!
//! ### Freshness
//! There is no realtime channel. Views poll (10 s for an order, 15 s for
//! lists and tracking) and push notifications invalidate cache tags so the
//! pollers refetch early. Both paths meet in one cache entry and the newest
//! response wins. A poll stops for good once its order is terminal.
//!
//! ### Actors
//! The query cache and the location reporter each run as a single Tokio task
//! that owns its state and is driven over an `mpsc` channel, so neither
//! needs a lock.
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`] - orders, staff, locations and roles as the backend sends them
//! - [`workflow`] - status actions, delivery estimates, multi-step forms
//! - [`api`] - the [`Transport`](api::Transport) seam and its Supabase implementation
//! - [`framework`] - the query cache actor
//! - [`clients`] - typed endpoint clients built on the cache
//! - [`polling`] / [`notifications`] - keeping views fresh
//! - [`tracking`] - location upload and live tracking
//! - [`otp`] / [`places`] - code entry and address search
//! - [`error`] - error types and user-facing messages
//! - [`lifecycle`] / [`config`] - wiring, logging and configuration
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! export SUPABASE_URL=https://<project>.supabase.co
//! export SUPABASE_ANON_KEY=<anon key>
//! RUST_LOG=info cargo run -- track <order_id>
//! ```

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod notifications;
pub mod otp;
pub mod places;
pub mod polling;
pub mod tracking;
pub mod workflow;
