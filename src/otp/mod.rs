//! One-time code entry for login (6 digits) and delivery completion (4 digits).

pub mod countdown;
pub mod input;

pub use countdown::*;
pub use input::*;
