//! Web vs native branching, decided once per runtime.

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

/// Runtime the client is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Web,
    Ios,
    Android,
    Desktop,
}

impl Platform {
    /// Platform of the current compilation target.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Web
        } else if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else {
            Self::Desktop
        }
    }
}

/// Result-handling strategy. Everything downstream branches on `is_web`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub is_web: bool,
}

/// Selects the web (cookie session) or native (bearer token) strategy.
#[must_use]
pub fn select_strategy(platform: Platform) -> Strategy {
    Strategy {
        is_web: matches!(platform, Platform::Web),
    }
}

/// Request options handed to [`AuthSession::fetch_with_auth`](crate::session::AuthSession::fetch_with_auth).
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl FetchOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::POST,
            body: Some(body.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Strategy {
    /// Value of the `platform` field sent to the token endpoint.
    #[must_use]
    pub fn platform_name(&self) -> &'static str {
        if self.is_web { "web" } else { "native" }
    }

    /// Adds the session credential to a request.
    ///
    /// Web: returned untouched; the session's cookie-holding HTTP client
    /// sends the session cookie on every request. Native: `Authorization:
    /// Bearer <token>` when a token is held, otherwise no header at all.
    #[must_use]
    pub fn authorize(&self, mut options: FetchOptions, access_token: Option<&str>) -> FetchOptions {
        if self.is_web {
            return options;
        }

        if let Some(token) = access_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    options.headers.insert(AUTHORIZATION, value);
                }
                Err(e) => tracing::warn!(error = %e, "Access token is not a valid header value"),
            }
        }
        options
    }
}
