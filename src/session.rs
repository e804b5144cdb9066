//! Appliance session state: connection coordinates, credentials and the
//! cached bearer token.
//!
//! A process owns a single [`Session`]. The token is created lazily by the
//! first login and replaced whenever the appliance rejects it. Refreshing is a
//! critical section: callers that saw the same token generation share one
//! login attempt and its outcome, whether it succeeded or not.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::client::ClientError;

/// Login identity presented to `auth/login`.
#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials, trimming the username.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_owned(),
            password: password.into(),
        }
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns true when both the username and password are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token issued by the appliance.
#[derive(Clone, Eq, PartialEq)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value for the `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Token cache contents as seen by one request.
///
/// `generation` counts completed login attempts. A caller hands it back to
/// [`Session::refresh`] so that a login finished while it waited is reused
/// instead of repeated.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CachedToken {
    /// Bearer token, absent until the first successful login.
    pub token: Option<Token>,
    /// Number of login attempts completed when this view was taken.
    pub generation: u64,
}

/// Live connection state shared by every request issued by a client.
#[derive(Debug)]
pub struct Session {
    base_url: String,
    credentials: Option<Credentials>,
    cache: RwLock<CachedToken>,
    last_login: Mutex<Option<Result<Token, ClientError>>>,
}

impl Session {
    /// Creates a session without a cached token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            base_url: base_url.into().trim().to_owned(),
            credentials,
            cache: RwLock::new(CachedToken::default()),
            last_login: Mutex::new(None),
        }
    }

    /// Base address every endpoint is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credentials used for login, when configured.
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the cached token, if any.
    pub async fn token(&self) -> Option<Token> {
        self.cache.read().await.token.clone()
    }

    /// Returns the cached token together with its login generation.
    pub async fn cached(&self) -> CachedToken {
        self.cache.read().await.clone()
    }

    /// Obtains a fresh token after the token seen at `observed` was rejected.
    ///
    /// Only one login runs at a time. When a login attempt completed after
    /// `observed` was taken, its outcome is returned as is, failure included,
    /// and `login` is never invoked.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Authentication`] when no usable credentials are
    /// configured, or whatever the deciding `login` returned.
    pub async fn refresh<F, Fut>(&self, observed: u64, login: F) -> Result<Token, ClientError>
    where
        F: FnOnce(Credentials) -> Fut,
        Fut: Future<Output = Result<Token, ClientError>>,
    {
        let mut last_login = self.last_login.lock().await;

        let generation = self.cache.read().await.generation;
        if generation != observed {
            if let Some(outcome) = last_login.as_ref() {
                debug!(
                    base_url = %self.base_url,
                    succeeded = outcome.is_ok(),
                    "reusing login completed by a concurrent request"
                );
                return outcome.clone();
            }
        }

        let credentials = self
            .credentials
            .clone()
            .filter(Credentials::is_complete)
            .ok_or_else(|| ClientError::Authentication {
                message: format!("no credentials configured for {}", self.base_url),
            })?;

        let outcome = login(credentials).await;
        {
            let mut cache = self.cache.write().await;
            cache.generation = generation + 1;
            if let Ok(fresh) = &outcome {
                cache.token = Some(fresh.clone());
            }
        }
        *last_login = Some(outcome.clone());
        outcome
    }
}
