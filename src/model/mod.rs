//! Backend-owned data as the client sees it: orders, staff, locations and roles.

pub mod delivery;
pub mod order;
pub mod user;

pub use delivery::*;
pub use order::*;
pub use user::*;
