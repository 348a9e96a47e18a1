//! The single authoritative holder of the [`Session`].
//!
//! `SessionStore` owns the bearer credential (through a [`TokenStore`]) and the
//! resolved user. Pages read it through [`SessionStore::snapshot`] or subscribe
//! to changes with [`SessionStore::subscribe`]; only the three mutating
//! operations (`refresh`, `adopt_credential`, `sign_out`) ever write it.
//!
//! None of the operations return errors. A credential the identity service
//! will not resolve, for whatever reason, leaves the session anonymous and
//! the credential purged. Failures are reported on the [`SessionEvent`]
//! channel and logged.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::{ApiError, IdentityService};
use crate::models::UserRecord;

use super::credentials::TokenStore;
use super::session::{Session, SessionEvent, SessionSnapshot};

/// Buffered session events per subscriber before the oldest are dropped
const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct SessionStore<I, T> {
    identity: I,
    tokens: T,
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    /// Bumped by every explicit credential change (`adopt_credential`,
    /// `sign_out`). A resolution only publishes if the generation it started
    /// under is still current.
    generation: AtomicU64,
}

impl<I: IdentityService, T: TokenStore> SessionStore<I, T> {
    /// Create a store in the `Resolving` state. Call [`refresh`](Self::refresh)
    /// to bootstrap from the persisted credential.
    pub fn new(identity: I, tokens: T) -> Self {
        let (state, _) = watch::channel(Session::resolving());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            identity,
            tokens,
            state,
            events,
            generation: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// Current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// `{ user, loading }` view for pages
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.state.borrow().user.clone()
    }

    /// Watch every session change. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Receive notifications for later operations
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The persisted credential, if any. Read errors count as absent.
    pub fn credential(&self) -> Option<String> {
        match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                None
            }
        }
    }

    /// Resolve the user from the persisted credential.
    pub async fn refresh(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        let token = self.credential();
        self.resolve(generation, token).await;
    }

    /// Persist a freshly issued credential and resolve its user.
    ///
    /// Used by sign-in and sign-up flows after their own call to the identity
    /// service has produced `token`.
    pub async fn adopt_credential(&self, token: &str) {
        self.bump_generation();
        if let Err(e) = self.tokens.store(token) {
            // Still resolve with the in-memory token so the caller is not left
            // waiting on a session that will never resolve
            warn!(error = %e, "Failed to persist credential");
        }
        // A refresh that read the previous credential holds an older generation
        let generation = self.bump_generation();
        self.resolve(generation, Some(token.to_string())).await;
    }

    /// Sign out locally and, best-effort, on the identity service.
    ///
    /// The local transition is identical whether or not the remote call
    /// succeeds: credential purged, user cleared, status `Resolved`.
    pub async fn sign_out(&self) {
        self.bump_generation();
        let token = self.credential();

        self.purge_credential();
        // Invalidates any refresh that loaded the credential before the purge
        self.bump_generation();
        self.state.send_replace(Session::resolved(None));
        info!("Signed out");

        let event = match token {
            Some(token) => match self.identity.invalidate_session(&token).await {
                Ok(()) => SessionEvent::SignedOut,
                Err(e) => {
                    warn!(error = %e, "Failed to invalidate server-side session");
                    SessionEvent::SignOutRemoteFailed {
                        reason: format!("{:#}", e),
                    }
                }
            },
            None => SessionEvent::SignedOut,
        };
        self.emit(event);
    }

    async fn resolve(&self, generation: u64, token: Option<String>) {
        let Some(token) = token else {
            debug!("No persisted credential, session is anonymous");
            if self.publish(generation, None) {
                self.emit(SessionEvent::Anonymous);
            }
            return;
        };

        match self.identity.current_user(&token).await {
            Ok(user) => {
                let user_id = user.id.clone();
                if self.publish(generation, Some(user)) {
                    debug!(user_id = %user_id, "Session resolved");
                    self.emit(SessionEvent::Resolved { user_id });
                } else {
                    debug!(user_id = %user_id, "Discarding resolution superseded by a newer sign-in or sign-out");
                }
            }
            Err(e) => {
                if !self.is_current(generation) {
                    debug!(error = %e, "Discarding failed resolution superseded by a newer sign-in or sign-out");
                    return;
                }
                let rejected = e
                    .downcast_ref::<ApiError>()
                    .map(ApiError::is_credential_rejected)
                    .unwrap_or(false);
                if rejected {
                    info!("Persisted credential rejected, signing out");
                } else {
                    warn!(error = %e, "Failed to resolve current user, signing out");
                }
                self.purge_if_unchanged(&token);
                if self.publish(generation, None) {
                    self.emit(SessionEvent::ResolutionFailed {
                        rejected,
                        reason: format!("{:#}", e),
                    });
                }
            }
        }
    }

    /// Start a new generation and return it
    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Write the resolved session unless a newer explicit transition happened
    /// since `generation` was taken. Returns whether it was written.
    fn publish(&self, generation: u64, user: Option<UserRecord>) -> bool {
        self.state.send_if_modified(|session| {
            if !self.is_current(generation) {
                return false;
            }
            *session = Session::resolved(user);
            true
        })
    }

    fn purge_credential(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to purge persisted credential");
        }
    }

    /// Purge the credential only if it is still the one that failed
    fn purge_if_unchanged(&self, token: &str) {
        match self.tokens.load() {
            Ok(Some(current)) if current != token => {
                debug!("Persisted credential changed during resolution, keeping it");
            }
            _ => self.purge_credential(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
