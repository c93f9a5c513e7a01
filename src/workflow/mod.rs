//! Client-side state machines: order status actions, delivery ETA picks and
//! multi-step forms.

pub mod eta;
pub mod status;
pub mod wizard;

pub use eta::*;
pub use status::*;
pub use wizard::*;
