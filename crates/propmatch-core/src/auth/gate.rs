//! Email-verification gate.
//!
//! A signed-in user whose email is not verified may only visit the routes in
//! [`VERIFICATION_ALLOW_LIST`]. Every other route is replaced with
//! [`VERIFY_EMAIL_ROUTE`]. Anonymous visitors and verified users are never
//! redirected here; role checks live in [`crate::auth::roles`].

use tokio::sync::watch;
use tracing::debug;

use super::session::Session;

pub const VERIFY_EMAIL_ROUTE: &str = "/verify-email";
pub const SIGN_IN_ROUTE: &str = "/auth";
pub const RESET_PASSWORD_ROUTE: &str = "/reset-password";
pub const FORGOT_PASSWORD_ROUTE: &str = "/forgot-password";

/// Routes reachable without a verified email
pub const VERIFICATION_ALLOW_LIST: [&str; 4] = [
    VERIFY_EMAIL_ROUTE,
    SIGN_IN_ROUTE,
    RESET_PASSWORD_ROUTE,
    FORGOT_PASSWORD_ROUTE,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Navigate to `to`, replacing the current history entry when `replace`
    Redirect { to: String, replace: bool },
}

impl GateDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, GateDecision::Redirect { .. })
    }
}

/// Applies navigation decisions. Implemented by the router.
pub trait Navigator {
    fn replace(&mut self, route: &str);
}

/// Strip any `?query` or `#fragment`; the allow-list matches paths exactly
pub fn route_path(route: &str) -> &str {
    let end = route.find(['?', '#']).unwrap_or(route.len());
    &route[..end]
}

pub fn is_allow_listed(route: &str) -> bool {
    let path = route_path(route);
    VERIFICATION_ALLOW_LIST.contains(&path)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn new() -> Self {
        Self
    }

    /// Decide what to do with `route` given the current session.
    pub fn evaluate(&self, session: &Session, route: &str) -> GateDecision {
        if !session.is_resolved() {
            return GateDecision::Allow;
        }
        let Some(user) = session.user.as_ref() else {
            return GateDecision::Allow;
        };
        if !user.email_verified && !is_allow_listed(route) {
            return GateDecision::Redirect {
                to: VERIFY_EMAIL_ROUTE.to_string(),
                replace: true,
            };
        }
        GateDecision::Allow
    }

    /// Evaluate `route` and apply any redirect through `navigator`.
    pub fn on_navigate<N: Navigator + ?Sized>(
        &self,
        session: &Session,
        route: &str,
        navigator: &mut N,
    ) -> GateDecision {
        let decision = self.evaluate(session, route);
        if let GateDecision::Redirect { to, .. } = &decision {
            debug!(from = route, to = %to, "Unverified email, redirecting");
            navigator.replace(to);
        }
        decision
    }

    /// Re-evaluate on every session change and every route change until
    /// either channel closes.
    ///
    /// The navigator is expected to feed replaced routes back into `route`,
    /// as a router would; the allow-list then stops any further redirect.
    pub async fn run<N: Navigator + Send>(
        self,
        mut session: watch::Receiver<Session>,
        mut route: watch::Receiver<String>,
        mut navigator: N,
    ) {
        loop {
            let current_session = session.borrow_and_update().clone();
            let current_route = route.borrow_and_update().clone();
            self.on_navigate(&current_session, &current_route, &mut navigator);

            tokio::select! {
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = route.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Access gate stopped");
    }
}
