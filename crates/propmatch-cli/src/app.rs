//! Command handlers for the propmatch CLI.
//!
//! `App` wires the session core together the way the web front-end does: the
//! sign-in and sign-up commands act as the auth forms, `open` acts as the
//! router, and session notifications are printed as toasts.

use std::io::{self, Write};

use anyhow::{Context, Result};
use propmatch_core::api::SignUpRequest;
use propmatch_core::auth::{authorize, Authorization, TokenStore, VERIFY_EMAIL_ROUTE};
use propmatch_core::{
    AccessGate, ApiClient, Config, GateDecision, Navigator, Role, SessionEvent, SessionStore,
    UserRecord,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Upper bound on redirects followed for a single navigation
const MAX_REDIRECTS: usize = 4;

pub type Store = SessionStore<ApiClient, Box<dyn TokenStore>>;

/// Terminal stand-in for the browser router
#[derive(Debug, Default)]
pub struct TerminalRouter {
    pub current: String,
    pub history: Vec<String>,
}

impl TerminalRouter {
    fn push(&mut self, route: &str) {
        self.history.push(route.to_string());
        self.current = route.to_string();
    }
}

impl Navigator for TerminalRouter {
    fn replace(&mut self, route: &str) {
        if let Some(last) = self.history.last_mut() {
            *last = route.to_string();
        } else {
            self.history.push(route.to_string());
        }
        self.current = route.to_string();
    }
}

pub struct App {
    pub config: Config,
    pub store: Store,
    gate: AccessGate,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        let base_url = config.api_base_url();
        debug!(base_url = %base_url, backend = ?config.token_backend, "Config loaded");

        let api = ApiClient::new(&base_url)?;
        let tokens = config.token_store()?;
        let store = SessionStore::new(api, tokens);
        let events = store.events();

        Ok(Self {
            config,
            store,
            gate: AccessGate::new(),
            events,
        })
    }

    fn api(&self) -> &ApiClient {
        self.store.identity()
    }

    /// Print every pending notification that has a toast
    fn flush_notifications(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    debug!(?event, "Session event");
                    if let Some(message) = event.toast_message() {
                        println!("» {}", message);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Dropped session events");
                }
                Err(_) => break,
            }
        }
    }

    fn print_session(&self) {
        let snapshot = self.store.snapshot();
        match snapshot.user {
            Some(user) => {
                println!("{}", signed_in_line(&user));
                println!("  name:            {}", user.name);
                println!("  role:            {}", user.role);
                println!("  email verified:  {}", yes_no(user.email_verified));
                println!("  active:          {}", yes_no(user.is_active));
                println!("  setup completed: {}", yes_no(user.setup_completed));
            }
            None => println!("Not signed in"),
        }
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn require_credential(&self) -> Result<String> {
        self.store
            .credential()
            .context("Not signed in. Run `propmatch login` first.")
    }

    pub async fn whoami(&mut self) -> Result<()> {
        self.store.refresh().await;
        self.flush_notifications();
        self.print_session();
        Ok(())
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = prompt_password()?;

        let auth = self.api().sign_in(&email, &password).await?;
        self.store.adopt_credential(&auth.token).await;
        self.flush_notifications();

        if self.store.current_user().is_none() {
            anyhow::bail!("Signed in, but the session could not be resolved");
        }
        info!(email = %email, "Login successful");
        self.remember_email(&email);
        self.print_session();
        self.announce_verification();
        Ok(())
    }

    pub async fn signup(&mut self, name: String, email: String, role: Role) -> Result<()> {
        let password = prompt_password()?;
        let request = SignUpRequest {
            name,
            email: email.clone(),
            password,
            role,
        };

        let auth = self.api().sign_up(&request).await?;
        self.store.adopt_credential(&auth.token).await;
        self.flush_notifications();

        info!(email = %email, role = %role, "Sign-up successful");
        self.remember_email(&email);
        self.print_session();
        self.announce_verification();
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.store.sign_out().await;
        self.flush_notifications();
        Ok(())
    }

    pub async fn verify(&mut self, code: &str) -> Result<()> {
        let token = self.require_credential()?;
        self.api().verify_email(&token, code).await?;
        self.store.refresh().await;
        self.flush_notifications();
        println!("Email verified");
        self.print_session();
        Ok(())
    }

    pub async fn resend_verification(&mut self) -> Result<()> {
        let token = self.require_credential()?;
        self.api().resend_verification(&token).await?;
        println!("Verification email sent");
        Ok(())
    }

    pub async fn forgot_password(&mut self, email: &str) -> Result<()> {
        self.api().request_password_reset(email).await?;
        println!("If an account exists for {}, a reset link is on its way", email);
        Ok(())
    }

    /// Resolve the session, then replay `routes` as a sequence of navigations
    pub async fn open(&mut self, routes: &[String]) -> Result<()> {
        self.store.refresh().await;
        self.flush_notifications();
        let session = self.store.session();

        let mut router = TerminalRouter::default();
        for route in routes {
            router.push(route);
            let mut redirects = 0;
            loop {
                let target = router.current.clone();
                let decision = self.gate.on_navigate(&session, &target, &mut router);
                if let GateDecision::Redirect { to, .. } = decision {
                    println!("{:<24} -> {} (verify your email first)", target, to);
                    redirects += 1;
                    if redirects >= MAX_REDIRECTS {
                        anyhow::bail!("Redirect loop while opening {}", route);
                    }
                    continue;
                }
                match authorize(&session, &target) {
                    Authorization::Allowed => println!("{:<24} ok", target),
                    Authorization::Pending => println!("{:<24} loading", target),
                    Authorization::AccountDisabled => {
                        println!("{:<24} blocked (account disabled)", target)
                    }
                    other => {
                        if let Some(to) = other.redirect() {
                            println!("{:<24} -> {} ({})", target, to, describe(&other));
                            router.replace(to);
                            redirects += 1;
                            if redirects < MAX_REDIRECTS {
                                continue;
                            }
                            anyhow::bail!("Redirect loop while opening {}", route);
                        }
                    }
                }
                break;
            }
        }
        debug!(history = ?router.history, "Navigation finished");
        Ok(())
    }

    fn announce_verification(&self) {
        if let Some(user) = self.store.current_user() {
            if user.needs_verification() {
                println!(
                    "Check {} for a verification code, then run `propmatch verify <code>` ({}).",
                    user.email, VERIFY_EMAIL_ROUTE
                );
            }
        }
    }
}

fn signed_in_line(user: &UserRecord) -> String {
    format!("Signed in as {} <{}>", user.display_name(), user.email)
}

fn describe(decision: &Authorization) -> &'static str {
    match decision {
        Authorization::SignInRequired { .. } => "sign in required",
        Authorization::Forbidden { .. } => "not your dashboard",
        Authorization::SetupRequired { .. } => "finish setup first",
        _ => "",
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} is required", label.trim_end_matches([':', ' ']));
    }
    Ok(value)
}

fn prompt_password() -> Result<String> {
    if let Ok(password) = std::env::var("PROPMATCH_PASSWORD") {
        return Ok(password);
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}
