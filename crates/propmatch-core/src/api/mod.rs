//! REST client module for the PropMatch identity service.
//!
//! This module provides the `IdentityService` trait the session core depends
//! on, and `ApiClient`, the HTTP implementation used by the sign-in and
//! sign-up flows.
//!
//! The service issues opaque bearer tokens; every authenticated call sends
//! the token in the `Authorization` header.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse, IdentityService, SignUpRequest};
pub use error::ApiError;
