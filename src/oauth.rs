use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use url::Url;

use crate::pkce;

/// Endpoints the client talks to. Both live on this app's backend, which
/// proxies the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryDocument {
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
}

impl DiscoveryDocument {
    /// `{base}/api/auth/authorize` and `{base}/api/auth/token`.
    ///
    /// # Errors
    ///
    /// Returns a parse error if `base_url` cannot be joined (e.g. `mailto:`).
    pub fn for_backend(base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            authorization_endpoint: base_url.join("/api/auth/authorize")?,
            token_endpoint: base_url.join("/api/auth/token")?,
        })
    }
}

/// Structured OAuth error returned by the interactive flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl AuthError {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
            uri: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{}: {desc}", self.code),
            None => f.write_str(&self.code),
        }
    }
}

/// Outcome of one interactive authorization round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    Success {
        code: String,
        params: BTreeMap<String, String>,
    },
    Cancel,
    Error(AuthError),
}

/// Authorization-code request with its PKCE artifact.
///
/// Lives for exactly one round trip; the verifier goes to the token
/// endpoint and is then discarded.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("url", &self.url.as_str())
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl AuthorizationRequest {
    /// Resolves a captured redirect against this request.
    ///
    /// Provider `error` wins; a redirect without a code is a cancellation;
    /// a code with the wrong `state` is rejected.
    #[must_use]
    pub fn parse_redirect(&self, redirect: &Url) -> AuthResponse {
        let params: BTreeMap<String, String> = redirect.query_pairs().into_owned().collect();

        if let Some(code) = params.get("error") {
            return AuthResponse::Error(AuthError {
                code: code.clone(),
                description: params.get("error_description").cloned(),
                uri: params.get("error_uri").cloned(),
            });
        }

        let Some(code) = params.get("code").cloned() else {
            return AuthResponse::Cancel;
        };

        if params.get("state") != Some(&self.state) {
            tracing::warn!("OAuth state mismatch on redirect");
            return AuthResponse::Error(
                AuthError::new("state_mismatch")
                    .with_description("Redirect state does not match the pending request"),
            );
        }

        AuthResponse::Success { code, params }
    }
}

/// Builds authorization-code + PKCE requests.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    scopes: Vec<String>,
    redirect_uri: String,
}

impl OAuthClient {
    #[must_use]
    pub fn new(client_id: impl Into<String>, scopes: Vec<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scopes,
            redirect_uri: redirect_uri.into(),
        }
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Fresh request with new `state` and PKCE verifier.
    #[must_use]
    pub fn build_authorization_request(&self, discovery: &DiscoveryDocument) -> AuthorizationRequest {
        let state = pkce::generate_state();
        let pkce::PkcePair {
            verifier: code_verifier,
            challenge: code_challenge,
        } = pkce::PkcePair::generate();
        let scope = self.scopes.join(" ");

        let mut url = discovery.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &scope)
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD);

        AuthorizationRequest {
            url,
            state,
            code_verifier,
            code_challenge,
            redirect_uri: self.redirect_uri.clone(),
        }
    }
}

/// Interactive consent in an external browser context.
///
/// Resolves once the host runtime captures the redirect, or the user
/// dismisses the browser.
pub trait BrowserPrompt: Send + Sync + 'static {
    fn prompt(&self, request: &AuthorizationRequest) -> impl Future<Output = AuthResponse> + Send;
}

/// Opens a URL in the system browser.
pub trait BrowserLauncher: Send + Sync + 'static {
    fn open(&self, url: &Url) -> Result<(), String>;
}

impl<F> BrowserLauncher for F
where
    F: Fn(&Url) -> Result<(), String> + Send + Sync + 'static,
{
    fn open(&self, url: &Url) -> Result<(), String> {
        self(url)
    }
}

/// Host-side handle that delivers captured redirects to a [`ChannelPrompt`].
#[derive(Debug, Clone)]
pub struct RedirectSender {
    tx: mpsc::Sender<Option<Url>>,
}

impl RedirectSender {
    /// Deliver the deep link / origin redirect the browser landed on.
    pub async fn redirect(&self, url: Url) -> bool {
        self.tx.send(Some(url)).await.is_ok()
    }

    /// The user closed the browser without finishing.
    pub async fn dismiss(&self) -> bool {
        self.tx.send(None).await.is_ok()
    }
}

/// [`BrowserPrompt`] fed by the host runtime through a [`RedirectSender`].
pub struct ChannelPrompt<L> {
    launcher: L,
    redirects: Mutex<mpsc::Receiver<Option<Url>>>,
}

/// Create a prompt and the sender the host uses to feed it.
#[must_use]
pub fn channel_prompt<L: BrowserLauncher>(launcher: L) -> (ChannelPrompt<L>, RedirectSender) {
    let (tx, rx) = mpsc::channel(1);
    (
        ChannelPrompt {
            launcher,
            redirects: Mutex::new(rx),
        },
        RedirectSender { tx },
    )
}

impl<L: BrowserLauncher> BrowserPrompt for ChannelPrompt<L> {
    async fn prompt(&self, request: &AuthorizationRequest) -> AuthResponse {
        let mut redirects = self.redirects.lock().await;
        // Stale redirects from an abandoned round trip.
        while redirects.try_recv().is_ok() {}

        if let Err(e) = self.launcher.open(&request.url) {
            tracing::error!(error = %e, "Failed to open browser");
            return AuthResponse::Error(AuthError::new("browser_unavailable").with_description(e));
        }

        match redirects.recv().await {
            Some(Some(url)) => request.parse_redirect(&url),
            Some(None) | None => AuthResponse::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn discovery() -> DiscoveryDocument {
        DiscoveryDocument::for_backend(&"http://localhost:8081".parse().unwrap()).unwrap()
    }

    fn client() -> OAuthClient {
        OAuthClient::new(
            "google",
            vec!["openid".into(), "profile".into(), "email".into()],
            "quranapp://",
        )
    }

    #[test]
    fn test_discovery_paths() {
        let doc = discovery();
        assert_eq!(
            doc.authorization_endpoint.as_str(),
            "http://localhost:8081/api/auth/authorize"
        );
        assert_eq!(doc.token_endpoint.as_str(), "http://localhost:8081/api/auth/token");
    }

    #[test]
    fn test_authorization_url_contains_pkce() {
        let req = client().build_authorization_request(&discovery());
        let query: BTreeMap<String, String> = req.url.query_pairs().into_owned().collect();

        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "google");
        assert_eq!(query["redirect_uri"], "quranapp://");
        assert_eq!(query["scope"], "openid profile email");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["state"], req.state);
        assert_eq!(
            query["code_challenge"],
            pkce::generate_code_challenge(&req.code_verifier)
        );
    }

    #[test]
    fn test_authorization_request_unique_per_call() {
        let req1 = client().build_authorization_request(&discovery());
        let req2 = client().build_authorization_request(&discovery());
        assert_ne!(req1.state, req2.state);
        assert_ne!(req1.code_verifier, req2.code_verifier);
    }

    #[test]
    fn test_debug_hides_verifier() {
        let req = client().build_authorization_request(&discovery());
        assert!(!format!("{req:?}").contains(&req.code_verifier));
    }

    #[test]
    fn test_parse_redirect_success() {
        let req = client().build_authorization_request(&discovery());
        let url = Url::parse(&format!("quranapp://?code=4%2F0abc&state={}", req.state)).unwrap();

        match req.parse_redirect(&url) {
            AuthResponse::Success { code, params } => {
                assert_eq!(code, "4/0abc");
                assert_eq!(params["state"], req.state);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_redirect_error() {
        let req = client().build_authorization_request(&discovery());
        let url = Url::parse("quranapp://?error=access_denied&error_description=denied").unwrap();

        assert_eq!(
            req.parse_redirect(&url),
            AuthResponse::Error(AuthError::new("access_denied").with_description("denied"))
        );
    }

    #[test]
    fn test_parse_redirect_state_mismatch() {
        let req = client().build_authorization_request(&discovery());
        let url = Url::parse("quranapp://?code=abc&state=forged").unwrap();

        match req.parse_redirect(&url) {
            AuthResponse::Error(err) => assert_eq!(err.code, "state_mismatch"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_redirect_without_code_is_cancel() {
        let req = client().build_authorization_request(&discovery());
        let url = Url::parse("quranapp://").unwrap();
        assert_eq!(req.parse_redirect(&url), AuthResponse::Cancel);
    }

    #[tokio::test]
    async fn test_channel_prompt_resolves_redirect() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let (prompt, sender) = channel_prompt(move |_: &Url| -> Result<(), String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let req = client().build_authorization_request(&discovery());
        let redirect = Url::parse(&format!("quranapp://?code=xyz&state={}", req.state)).unwrap();

        let (response, delivered) = tokio::join!(prompt.prompt(&req), sender.redirect(redirect));
        assert!(delivered);
        assert!(matches!(response, AuthResponse::Success { ref code, .. } if code == "xyz"));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_prompt_dismiss_is_cancel() {
        let (prompt, sender) = channel_prompt(|_: &Url| -> Result<(), String> { Ok(()) });
        let req = client().build_authorization_request(&discovery());

        let (response, _) = tokio::join!(prompt.prompt(&req), sender.dismiss());
        assert_eq!(response, AuthResponse::Cancel);
    }

    #[tokio::test]
    async fn test_channel_prompt_dropped_sender_is_cancel() {
        let (prompt, sender) = channel_prompt(|_: &Url| -> Result<(), String> { Ok(()) });
        drop(sender);
        let req = client().build_authorization_request(&discovery());
        assert_eq!(prompt.prompt(&req).await, AuthResponse::Cancel);
    }

    #[tokio::test]
    async fn test_channel_prompt_launch_failure() {
        let (prompt, _sender) = channel_prompt(|_: &Url| Err("no browser".to_string()));
        let req = client().build_authorization_request(&discovery());

        match prompt.prompt(&req).await {
            AuthResponse::Error(err) => assert_eq!(err.code, "browser_unavailable"),
            other => panic!("expected error, got {other:?}"),
        }
    }
}
