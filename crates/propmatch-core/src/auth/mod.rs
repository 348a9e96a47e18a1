//! Authentication module: session lifecycle and route gating.
//!
//! This module provides:
//! - `SessionStore`: owns the bearer credential and the resolved user
//! - `TokenStore` implementations: keychain, JSON file, in-memory
//! - `AccessGate`: sends unverified users to the verification route
//! - `roles`: dashboard authorization by role

pub mod credentials;
pub mod gate;
pub mod roles;
pub mod session;
pub mod store;

pub use credentials::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use gate::{AccessGate, GateDecision, Navigator, VERIFICATION_ALLOW_LIST, VERIFY_EMAIL_ROUTE};
pub use roles::{authorize, Authorization};
pub use session::{Session, SessionEvent, SessionSnapshot, SessionStatus};
pub use store::SessionStore;
