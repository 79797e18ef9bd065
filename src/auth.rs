use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use librespot::core::cache::Cache;

const SPOTIFY_CLIENT_ID: &str = "492e1e45ea814fa3ac555fe1576aaf5b";
const SPOTIFY_REDIRECT_URI: &str = "http://127.0.0.1:8898/login";
pub const SCOPES: &str =
    "streaming user-read-playback-state user-modify-playback-state user-read-currently-playing user-library-read user-read-private user-read-email";

const RESPONSE: &str = r#"
<!doctype html>
<html>
<head><title>Success</title></head>
<body><h1>Authentication Successful!</h1><script>window.close();</script></body>
</html>
"#;
const CACHE: &str = ".cache";
const CACHE_FILES: &str = ".cache/files";
const REFRESH_TOKEN_FILE: &str = ".cache/refresh_token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
/// Refresh when fewer than this many seconds remain
const REFRESH_MARGIN_SECS: i64 = 300;

/// Source of bearer tokens for the remote device and the Web API.
///
/// Callers must ask for a token every time they need one; tokens expire.
#[async_trait]
pub trait TokenService: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// A currently valid access token, refreshing first if needed.
    async fn valid_access_token(&self) -> Option<String>;
}

#[derive(Clone)]
pub struct AuthResult {
    pub access_token: String,
    pub refresh_token: String,
    pub cache: Cache,
}

fn oauth_client(open_browser: bool) -> Result<librespot_oauth::OAuthClient> {
    let mut builder = librespot_oauth::OAuthClientBuilder::new(
        SPOTIFY_CLIENT_ID,
        SPOTIFY_REDIRECT_URI,
        SCOPES.split_whitespace().collect(),
    );
    if open_browser {
        builder = builder.open_in_browser().with_custom_message(RESPONSE);
    }
    builder.build().context("Failed to build OAuth client")
}

async fn perform_browser_auth() -> Result<(String, String)> {
    tracing::info!("Starting browser-based OAuth flow");
    let token = oauth_client(true)?
        .get_access_token_async()
        .await
        .context("Failed to get token")?;

    let _ = fs::write(REFRESH_TOKEN_FILE, &token.refresh_token);
    tracing::debug!("Saved refresh token to disk");

    tracing::info!("Browser authentication completed successfully");
    Ok((token.access_token, token.refresh_token))
}

pub async fn perform_oauth_flow() -> Result<AuthResult> {
    let cache = Cache::new(Some(CACHE), Some(CACHE), Some(CACHE_FILES), None)?;

    let stored_refresh_token = fs::read_to_string(REFRESH_TOKEN_FILE).ok();

    let (access_token, refresh_token) =
        if let Some(refresh_token) = stored_refresh_token.filter(|t| !t.trim().is_empty()) {
            tracing::info!("Found cached refresh token");

            match refresh_access_token(refresh_token.trim()).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::warn!(error = %e, "Cached refresh token failed, re-authenticating");
                    perform_browser_auth().await?
                }
            }
        } else {
            tracing::info!("No cached refresh token found, starting browser authentication");
            perform_browser_auth().await?
        };

    Ok(AuthResult {
        access_token,
        refresh_token,
        cache,
    })
}

/// Exchange a refresh token for a new access token, persisting the rotated
/// refresh token.
pub async fn refresh_access_token(refresh_token: &str) -> Result<(String, String)> {
    let new_token = oauth_client(false)?.refresh_token_async(refresh_token).await?;
    let _ = fs::write(REFRESH_TOKEN_FILE, &new_token.refresh_token);
    tracing::debug!("Token refreshed successfully");
    Ok((new_token.access_token, new_token.refresh_token))
}

struct TokenState {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// OAuth-backed [`TokenService`]
pub struct SpotifyTokens {
    state: RwLock<TokenState>,
    authenticated: AtomicBool,
}

impl SpotifyTokens {
    pub fn new(auth: &AuthResult) -> Self {
        Self {
            state: RwLock::new(TokenState {
                access_token: auth.access_token.clone(),
                refresh_token: auth.refresh_token.clone(),
                expires_at: Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS),
            }),
            authenticated: AtomicBool::new(!auth.access_token.is_empty()),
        }
    }

    fn needs_refresh(expires_at: DateTime<Utc>) -> bool {
        (expires_at - Utc::now()).num_seconds() < REFRESH_MARGIN_SECS
    }
}

#[async_trait]
impl TokenService for SpotifyTokens {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    async fn valid_access_token(&self) -> Option<String> {
        {
            let state = self.state.read().await;
            if !Self::needs_refresh(state.expires_at) {
                return Some(state.access_token.clone());
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have refreshed while we waited for the lock
        if !Self::needs_refresh(state.expires_at) {
            return Some(state.access_token.clone());
        }

        tracing::info!("Token expiring soon, refreshing...");
        match refresh_access_token(&state.refresh_token).await {
            Ok((access_token, refresh_token)) => {
                state.access_token = access_token;
                state.refresh_token = refresh_token;
                state.expires_at = Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS);
                self.authenticated.store(true, Ordering::Release);
                Some(state.access_token.clone())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh token");
                self.authenticated.store(false, Ordering::Release);
                None
            }
        }
    }
}
