//! API client for communicating with the PropMatch identity service.
//!
//! This module provides the `IdentityService` trait consumed by the session
//! store and the `ApiClient` struct that implements it over HTTP.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Role, UserRecord};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the identity service
pub const DEFAULT_API_BASE_URL: &str = "https://api.propmatch.app";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Identity service contract
// ============================================================================

/// The two identity-service operations the session core depends on.
pub trait IdentityService: Send + Sync {
    /// Resolve the user that owns `token`. Fails on a missing, invalid or
    /// expired credential as well as on transport errors.
    fn current_user(&self, token: &str) -> impl Future<Output = Result<UserRecord>> + Send;

    /// Invalidate the server-side session for `token`. Best-effort.
    fn invalidate_session(&self, token: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: IdentityService> IdentityService for Arc<T> {
    fn current_user(&self, token: &str) -> impl Future<Output = Result<UserRecord>> + Send {
        (**self).current_user(token)
    }

    fn invalidate_session(&self, token: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).invalidate_session(token)
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Response to a successful sign-in or sign-up
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    pub token: String,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyEmailRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordResetRequest<'a> {
    email: &'a str,
}

/// `/auth/me` answers either with the bare record or wrapped in `{ "user": ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CurrentUserResponse {
    Wrapped { user: UserRecord },
    Bare(UserRecord),
}

impl CurrentUserResponse {
    fn into_user(self) -> UserRecord {
        match self {
            CurrentUserResponse::Wrapped { user } => user,
            CurrentUserResponse::Bare(user) => user,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// API client for the identity service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Self::normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Require an http(s) scheme and strip trailing slashes so paths can be appended
    fn normalize_base_url(base_url: &str) -> Result<String> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let host = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| {
                anyhow::anyhow!("API base URL must start with http:// or https://: {}", base_url)
            })?;
        if host.is_empty() {
            anyhow::bail!("API base URL has no host: {}", base_url);
        }
        Ok(trimmed.to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Credential contains characters not allowed in a header")?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .headers(Self::auth_headers(token)?)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T> {
        let response = self.post_raw(path, token, body).await?;
        let url = self.url(path);
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// POST whose response body is ignored
    async fn post_raw<B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .headers(Self::auth_headers(token)?)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        Self::check_response(response).await
    }

    // ===== Auth form operations =====

    /// Exchange email and password for a bearer token
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        debug!(email = email, "Signing in");
        self.post("/auth/login", None, &SignInRequest { email, password })
            .await
            .context("Sign-in failed")
    }

    /// Register a new account and receive its first bearer token
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse> {
        debug!(email = %request.email, role = %request.role, "Signing up");
        self.post("/auth/register", None, request)
            .await
            .context("Sign-up failed")
    }

    /// Confirm the email address with the code the user received
    pub async fn verify_email(&self, token: &str, code: &str) -> Result<()> {
        self.post_raw("/auth/verify-email", Some(token), &VerifyEmailRequest { code })
            .await
            .context("Email verification failed")?;
        Ok(())
    }

    /// Ask the service to send a fresh verification code
    pub async fn resend_verification(&self, token: &str) -> Result<()> {
        self.post_raw("/auth/resend-verification", Some(token), &serde_json::json!({}))
            .await
            .context("Failed to resend verification email")?;
        Ok(())
    }

    /// Start the password-reset flow for `email`
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.post_raw("/auth/forgot-password", None, &PasswordResetRequest { email })
            .await
            .context("Failed to request password reset")?;
        Ok(())
    }
}

impl IdentityService for ApiClient {
    async fn current_user(&self, token: &str) -> Result<UserRecord> {
        let response: CurrentUserResponse = self.get("/auth/me", Some(token)).await?;
        Ok(response.into_user())
    }

    async fn invalidate_session(&self, token: &str) -> Result<()> {
        self.post_raw("/auth/logout", Some(token), &serde_json::json!({}))
            .await
            .context("Failed to invalidate session")?;
        Ok(())
    }
}
