//! Data models shared between the identity service and the session core.
//!
//! - `UserRecord`: the authenticated user as returned by the identity service
//! - `Role`: which dashboard a user belongs to

pub mod user;

pub use user::{Role, UserRecord};
