use std::time::Duration;

use url::Url;

use super::error::EndpointError;

/// Validity window of a session token and its cookie (2 days).
pub const SESSION_VALIDITY: Duration = Duration::from_secs(172_800);

/// Shared auth settings with defaults.
#[derive(Debug, Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_name: String,
    pub(crate) token_validity: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) internal_client_id: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_name: "auth_token".into(),
            token_validity: SESSION_VALIDITY,
            secure_cookies: false,
            auth_path: "/api/auth".into(),
            internal_client_id: "google".into(),
        }
    }
}

/// Where an authorization request came from, judged by its redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallerPlatform {
    Web,
    Mobile,
}

impl CallerPlatform {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
        }
    }
}

/// Backend token endpoint configuration.
///
/// Required values are constructor parameters. Use
/// [`from_env()`](ServerConfig::from_env) for convention-based setup.
#[derive(Clone)]
pub struct ServerConfig {
    pub(crate) google_client_id: String,
    pub(crate) google_client_secret: String,
    pub(crate) base_url: Url,
    pub(crate) app_scheme: String,
    pub(crate) jwt_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) settings: AuthSettings,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("google_client_id", &self.google_client_id)
            .field("base_url", &self.base_url.as_str())
            .field("app_scheme", &self.app_scheme)
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    #[must_use]
    pub fn new(
        google_client_id: impl Into<String>,
        google_client_secret: impl Into<String>,
        base_url: Url,
        app_scheme: impl Into<String>,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            google_client_id: google_client_id.into(),
            google_client_secret: google_client_secret.into(),
            base_url,
            app_scheme: app_scheme.into(),
            jwt_secret: jwt_secret.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth"
                .parse()
                .expect("valid default URL"),
            token_url: "https://oauth2.googleapis.com/token"
                .parse()
                .expect("valid default URL"),
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`: registered OAuth client
    /// - `EXPO_PUBLIC_BASE_URL`: public origin of this backend
    /// - `EXPO_PUBLIC_SCHEME`: native app deep-link scheme
    /// - `JWT_SECRET`: session token signing secret
    ///
    /// # Optional env vars
    /// - `GOOGLE_AUTH_URL`, `GOOGLE_TOKEN_URL`: override provider endpoints
    /// - `AUTH_COOKIE_SECURE`: `"1"` or `"true"` adds `Secure` to the session cookie
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, EndpointError> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| EndpointError::Config(format!("{name} is required")))
        };
        let parse_url = |name: &str, value: String| {
            value
                .parse::<Url>()
                .map_err(|e| EndpointError::Config(format!("{name}: {e}")))
        };

        let base_url = parse_url("EXPO_PUBLIC_BASE_URL", required("EXPO_PUBLIC_BASE_URL")?)?;
        let mut config = Self::new(
            required("GOOGLE_CLIENT_ID")?,
            required("GOOGLE_CLIENT_SECRET")?,
            base_url,
            required("EXPO_PUBLIC_SCHEME")?,
            required("JWT_SECRET")?,
        );

        if let Ok(value) = std::env::var("GOOGLE_AUTH_URL") {
            config = config.with_auth_url(parse_url("GOOGLE_AUTH_URL", value)?);
        }
        if let Ok(value) = std::env::var("GOOGLE_TOKEN_URL") {
            config = config.with_token_url(parse_url("GOOGLE_TOKEN_URL", value)?);
        }
        let secure = matches!(
            std::env::var("AUTH_COOKIE_SECURE").as_deref(),
            Ok("1") | Ok("true"),
        );

        Ok(config.with_secure_cookies(secure))
    }

    /// Override the identity provider's authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the identity provider's token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_token_validity(mut self, validity: Duration) -> Self {
        self.settings.token_validity = validity;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.settings.cookie_name
    }

    /// Redirect URI registered with the identity provider.
    #[must_use]
    pub fn provider_redirect_uri(&self) -> String {
        format!(
            "{}{}/callback",
            self.web_origin(),
            self.settings.auth_path
        )
    }

    pub(crate) fn web_origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }

    pub(crate) fn app_redirect(&self) -> String {
        format!("{}://", self.app_scheme)
    }

    pub(crate) fn classify_redirect(&self, redirect_uri: &str) -> Option<CallerPlatform> {
        if redirect_uri.starts_with(&self.web_origin()) {
            Some(CallerPlatform::Web)
        } else if redirect_uri.starts_with(&self.app_redirect()) {
            Some(CallerPlatform::Mobile)
        } else {
            None
        }
    }
}
