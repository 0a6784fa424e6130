use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::oauth::DiscoveryDocument;
use crate::platform::Strategy;

/// Secure storage key of the native bearer token.
pub const TOKEN_KEY_NAME: &str = "accessToken";

/// Client-side auth configuration.
///
/// Required fields are constructor parameters; everything else has a default
/// and a `with_*` override.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) app_scheme: String,
    pub(crate) client_id: String,
    pub(crate) scopes: Vec<String>,
    pub(crate) token_key: String,
    pub(crate) request_timeout: Duration,
    pub(crate) discovery: Option<DiscoveryDocument>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url, app_scheme: impl Into<String>) -> Self {
        Self {
            base_url,
            app_scheme: app_scheme.into(),
            client_id: "google".into(),
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
            token_key: TOKEN_KEY_NAME.into(),
            request_timeout: Duration::from_secs(30),
            discovery: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `EXPO_PUBLIC_BASE_URL`: backend origin
    /// - `EXPO_PUBLIC_SCHEME`: native deep-link scheme
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is missing or the URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let base_url: Url = std::env::var("EXPO_PUBLIC_BASE_URL")
            .map_err(|_| Error::Config("EXPO_PUBLIC_BASE_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("EXPO_PUBLIC_BASE_URL: {e}")))?;
        let scheme = std::env::var("EXPO_PUBLIC_SCHEME")
            .map_err(|_| Error::Config("EXPO_PUBLIC_SCHEME is required".into()))?;
        Ok(Self::new(base_url, scheme))
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Upper bound on every backend request (exchange, session, logout).
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryDocument) -> Self {
        self.discovery = Some(discovery);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// Deep link (`scheme://`) on native, backend origin on web.
    #[must_use]
    pub fn redirect_uri(&self, strategy: Strategy) -> String {
        if strategy.is_web {
            self.base_url.origin().ascii_serialization()
        } else {
            format!("{}://", self.app_scheme)
        }
    }

    /// Explicit discovery document, or the backend defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL cannot carry paths.
    pub fn discovery(&self) -> Result<DiscoveryDocument, Error> {
        match &self.discovery {
            Some(doc) => Ok(doc.clone()),
            None => DiscoveryDocument::for_backend(&self.base_url)
                .map_err(|e| Error::Config(format!("discovery: {e}"))),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("{path}: {e}")))
    }
}
