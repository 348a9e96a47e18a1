//! Session and authorization core for the PropMatch marketplace client.
//!
//! - [`auth::SessionStore`] owns the bearer credential and the resolved user
//! - [`auth::AccessGate`] keeps unverified users on the verification route
//! - [`auth::roles`] authorizes dashboard routes by role
//! - [`api::ApiClient`] talks to the identity service

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, IdentityService};
pub use auth::{AccessGate, GateDecision, Navigator, Session, SessionEvent, SessionSnapshot, SessionStore};
pub use config::Config;
pub use models::{Role, UserRecord};
