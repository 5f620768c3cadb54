//! Reactive bearer-token handling.
//!
//! There is no expiry tracking: a token is assumed valid until a request made
//! with it fails, at which point the caller asks for a fresh login.

use tracing::{info, warn};

use tmplsync_core::config::UpstreamConfig;

use crate::api::UpstreamApi;
use crate::error::SourceError;

/// The cached bearer token. Empty until the first successful login.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    token: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credential {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// The cached token, if any. No side effects.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none()
    }
}

/// Logs in with the configured service account when asked to.
#[derive(Clone)]
pub struct CredentialManager {
    username: String,
    password: String,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CredentialManager {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `None` when the config carries no username/password pair.
    pub fn from_config(config: &UpstreamConfig) -> Option<Self> {
        match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some(Self::new(username.clone(), password.clone())),
            _ => None,
        }
    }

    /// Log in and replace the cached token.
    ///
    /// On failure the previous token is left untouched.
    pub async fn reauthenticate(
        &self,
        api: &dyn UpstreamApi,
        credential: &mut Credential,
    ) -> Result<(), SourceError> {
        match api.login(&self.username, &self.password).await {
            Ok(token) => {
                credential.token = Some(token);
                info!(username = %self.username, "re-authenticated with upstream");
                Ok(())
            }
            Err(e) => {
                warn!(username = %self.username, error = %e, "upstream login failed");
                Err(e)
            }
        }
    }
}
