use serde::Serialize;

use crate::models::UserRecord;

/// Whether the initial identity resolution has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The first resolution is still in flight. Nothing may redirect yet.
    Resolving,
    /// A user was resolved, or the session is confirmed anonymous.
    Resolved,
}

/// Who is using the app right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub status: SessionStatus,
}

impl Session {
    /// Anonymous session awaiting its first resolution
    pub fn resolving() -> Self {
        Self {
            user: None,
            status: SessionStatus::Resolving,
        }
    }

    pub fn resolved(user: Option<UserRecord>) -> Self {
        Self {
            user,
            status: SessionStatus::Resolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == SessionStatus::Resolved
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            loading: !self.is_resolved(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::resolving()
    }
}

/// The read view handed to pages: `{ user, loading }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionSnapshot {
    pub user: Option<UserRecord>,
    pub loading: bool,
}

/// Notifications emitted by the session store. Failures that the store
/// swallows are reported here so callers can observe them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user was resolved from the persisted credential
    Resolved { user_id: String },
    /// No credential was persisted
    Anonymous,
    /// Resolving the credential failed and the credential has been purged.
    /// `rejected` is set when the identity service refused the credential,
    /// clear when the service could not be reached or answered badly.
    ResolutionFailed { rejected: bool, reason: String },
    /// Signed out and the server-side session was invalidated
    SignedOut,
    /// Signed out locally, but invalidating the server-side session failed
    SignOutRemoteFailed { reason: String },
}

impl SessionEvent {
    /// Short user-facing text for a toast
    pub fn toast_message(&self) -> Option<&'static str> {
        match self {
            SessionEvent::SignedOut => Some("Signed out successfully"),
            SessionEvent::SignOutRemoteFailed { .. } => {
                Some("Signed out locally, but the server could not be reached")
            }
            _ => None,
        }
    }
}
