//! Live delivery tracking.
//!
//! - [`LocationReporter`] - delivery side: samples in, throttled uploads out
//! - [`TrackingView`] - customer/admin side: polls the latest location
//! - [`UploadThrottle`] and [`ListenerRegistry`] - the pieces the reporter is built from

pub mod listeners;
pub mod reporter;
pub mod throttle;
pub mod view;

pub use listeners::*;
pub use reporter::*;
pub use throttle::*;
pub use view::*;
