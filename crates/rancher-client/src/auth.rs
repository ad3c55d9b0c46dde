//! Token acquisition and caching
//!
//! The client authenticates either with a long-lived API token or with a
//! (username, password) pair exchanged for a short-lived token through the
//! local login action. Login-derived tokens are cached and refreshed under
//! a single-permit semaphore: a caller that finds the token expired
//! acquires the permit, re-checks under the permit, refreshes on miss and
//! releases. Concurrent callers never trigger duplicate logins.

use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info};

use crate::error::RancherError;
use crate::models::ApiToken;

/// Tokens live at least 12 h; used when the login response carries no ttl.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Client credentials
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Long-lived API token used as-is
    Token(String),
    /// Username/password exchanged for a cached, auto-refreshed token
    Login { username: String, password: String },
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Caching token source shared by all requests of one client
pub struct TokenProvider {
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
    refresh_permit: Semaphore,
}

impl TokenProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
            refresh_permit: Semaphore::new(1),
        }
    }

    /// Returns a valid bearer token, logging in when the cache is cold or
    /// the cached token expired.
    pub async fn token(
        &self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<String, RancherError> {
        let (username, password) = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::Login { username, password } => (username.clone(), password.clone()),
        };

        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _permit = self
            .refresh_permit
            .acquire()
            .await
            .map_err(|_| RancherError::Authentication("token refresher shut down".to_string()))?;

        // Another caller may have refreshed while we waited for the permit
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let fresh = login(http, base_url, &username, &password).await?;
        let token = fresh.token.clone();
        *self.cached.lock().await = Some(fresh);
        Ok(token)
    }

    async fn cached_token(&self) -> Option<String> {
        let guard = self.cached.lock().await;
        match guard.as_ref() {
            Some(cached) if Instant::now() < cached.expires_at => Some(cached.token.clone()),
            _ => None,
        }
    }
}

async fn login(
    http: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<CachedToken, RancherError> {
    let url = format!("{base_url}/v3-public/localProviders/local?action=login");
    debug!("Logging in to Rancher at {}", base_url);

    let response = http
        .post(&url)
        .header("Accept", "application/json")
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "description": "rancher-devops-operator",
        }))
        .send()
        .await
        .map_err(RancherError::Http)?;

    let status = response.status();
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(RancherError::Authentication(format!(
            "login rejected: {status} - {body}"
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RancherError::Api(format!("login failed: {status} - {body}")));
    }

    let token: ApiToken = response.json().await.map_err(RancherError::Http)?;

    // Refresh at 90% of the advertised lifetime so in-flight requests never
    // ride an expiring token.
    let ttl = match token.ttl {
        Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
        _ => DEFAULT_TOKEN_TTL,
    };
    let refresh_after = ttl.mul_f64(0.9);

    info!("Obtained Rancher API token (refresh in {:?})", refresh_after);

    Ok(CachedToken {
        token: token.token,
        expires_at: Instant::now() + refresh_after,
    })
}
