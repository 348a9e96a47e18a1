//! Role-based route authorization for the dashboards.
//!
//! Each dashboard lives under its own prefix and belongs to one role.
//! Routes outside those prefixes are public as far as this policy is
//! concerned. This runs alongside [`AccessGate`](super::AccessGate), which
//! handles email verification.

use crate::models::Role;

use super::gate::{route_path, SIGN_IN_ROUTE};
use super::session::Session;

/// Where developers finish onboarding before reaching their dashboard
pub const DEVELOPER_SETUP_ROUTE: &str = "/developer/setup";

/// Dashboard prefixes and the role that owns each
const PROTECTED_PREFIXES: [(&str, Role); 3] = [
    ("/admin", Role::Admin),
    ("/developer", Role::Developer),
    ("/client", Role::Client),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    /// Session still resolving; render a loading state
    Pending,
    SignInRequired { redirect: String },
    AccountDisabled,
    Forbidden { redirect: String },
    SetupRequired { redirect: String },
}

impl Authorization {
    /// Target route when the decision is a redirect
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Authorization::SignInRequired { redirect }
            | Authorization::Forbidden { redirect }
            | Authorization::SetupRequired { redirect } => Some(redirect.as_str()),
            _ => None,
        }
    }
}

/// Role required for `route`, if it sits under a dashboard prefix.
/// `/developers` does not match `/developer`.
pub fn required_role(route: &str) -> Option<Role> {
    let path = route_path(route);
    PROTECTED_PREFIXES.iter().find_map(|(prefix, role)| {
        let rest = path.strip_prefix(*prefix)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(*role)
    })
}

/// Decide whether the session may render `route`.
pub fn authorize(session: &Session, route: &str) -> Authorization {
    let Some(required) = required_role(route) else {
        return Authorization::Allowed;
    };
    if !session.is_resolved() {
        return Authorization::Pending;
    }
    let Some(user) = session.user.as_ref() else {
        return Authorization::SignInRequired {
            redirect: SIGN_IN_ROUTE.to_string(),
        };
    };
    if !user.is_active {
        return Authorization::AccountDisabled;
    }
    if user.role != required {
        return Authorization::Forbidden {
            redirect: user.role.dashboard_path().to_string(),
        };
    }
    if user.role == Role::Developer
        && !user.setup_completed
        && route_path(route) != DEVELOPER_SETUP_ROUTE
    {
        return Authorization::SetupRequired {
            redirect: DEVELOPER_SETUP_ROUTE.to_string(),
        };
    }
    Authorization::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRecord;

    fn session_for(role: Role) -> Session {
        Session::resolved(Some(UserRecord {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role,
            email_verified: true,
            is_active: true,
            setup_completed: true,
            created_at: None,
        }))
    }

    #[test]
    fn test_required_role() {
        assert_eq!(required_role("/admin"), Some(Role::Admin));
        assert_eq!(required_role("/admin/users?page=2"), Some(Role::Admin));
        assert_eq!(required_role("/developer/projects/7"), Some(Role::Developer));
        assert_eq!(required_role("/client"), Some(Role::Client));
        assert_eq!(required_role("/developers"), None);
        assert_eq!(required_role("/projects"), None);
        assert_eq!(required_role("/"), None);
    }

    #[test]
    fn test_public_routes_always_allowed() {
        assert_eq!(authorize(&Session::resolving(), "/projects"), Authorization::Allowed);
        assert_eq!(authorize(&Session::resolved(None), "/"), Authorization::Allowed);
    }

    #[test]
    fn test_pending_while_resolving() {
        assert_eq!(authorize(&Session::resolving(), "/admin"), Authorization::Pending);
    }

    #[test]
    fn test_anonymous_must_sign_in() {
        let decision = authorize(&Session::resolved(None), "/client/dashboard");
        assert_eq!(decision.redirect(), Some("/auth"));
    }

    #[test]
    fn test_role_matrix() {
        let routes = [
            ("/admin", Role::Admin),
            ("/developer", Role::Developer),
            ("/client", Role::Client),
        ];
        for role in [Role::Admin, Role::Developer, Role::Client] {
            let session = session_for(role);
            for (route, owner) in routes {
                let decision = authorize(&session, route);
                if role == owner {
                    assert_eq!(decision, Authorization::Allowed, "{} on {}", role, route);
                } else {
                    assert_eq!(
                        decision,
                        Authorization::Forbidden {
                            redirect: role.dashboard_path().to_string()
                        },
                        "{} on {}",
                        role,
                        route
                    );
                }
            }
        }
    }

    #[test]
    fn test_inactive_account() {
        let mut session = session_for(Role::Client);
        session.user.as_mut().unwrap().is_active = false;
        assert_eq!(authorize(&session, "/client"), Authorization::AccountDisabled);
        assert_eq!(authorize(&session, "/projects"), Authorization::Allowed);
    }

    #[test]
    fn test_developer_setup_required() {
        let mut session = session_for(Role::Developer);
        session.user.as_mut().unwrap().setup_completed = false;
        assert_eq!(
            authorize(&session, "/developer/projects").redirect(),
            Some(DEVELOPER_SETUP_ROUTE)
        );
        assert_eq!(authorize(&session, DEVELOPER_SETUP_ROUTE), Authorization::Allowed);

        // Setup only applies to developers
        let mut client = session_for(Role::Client);
        client.user.as_mut().unwrap().setup_completed = false;
        assert_eq!(authorize(&client, "/client"), Authorization::Allowed);
    }
}
