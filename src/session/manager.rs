use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::multipart;
use serde::Deserialize;
use tokio::sync::{Mutex, watch};

use super::config::ClientConfig;
use super::state::{AuthState, Phase};
use crate::error::Error;
use crate::oauth::{
    AuthError, AuthResponse, AuthorizationRequest, BrowserPrompt, DiscoveryDocument, OAuthClient,
};
use crate::platform::{FetchOptions, Platform, Strategy, select_strategy};
use crate::store::TokenStore;
use crate::token;
use crate::types::AuthUser;

/// User and (native only) bearer token recovered by a restore.
type Restored = Option<(AuthUser, Option<String>)>;

#[derive(Deserialize)]
struct NativeTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct WebTokenResponse {
    #[serde(default)]
    success: bool,
}

/// Owns the client's auth state and drives restore, sign-in and sign-out.
///
/// One instance per runtime. Create with [`init`](Self::init), share it by
/// reference (or `Arc`), call [`dispose`](Self::dispose) on teardown.
pub struct AuthSession<P> {
    config: ClientConfig,
    strategy: Strategy,
    oauth: OAuthClient,
    discovery: DiscoveryDocument,
    prompt: P,
    store: Option<Arc<dyn TokenStore>>,
    http: reqwest::Client,
    state: watch::Sender<AuthState>,
    pending: Mutex<Option<AuthorizationRequest>>,
    sign_in_busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: BrowserPrompt> AuthSession<P> {
    /// Build a session without touching the network or the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a native platform has no token store or
    /// the discovery URLs cannot be derived, [`Error::Http`] if the HTTP
    /// client cannot be built.
    pub fn new(
        config: ClientConfig,
        platform: Platform,
        prompt: P,
        store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self, Error> {
        let strategy = select_strategy(platform);
        if !strategy.is_web && store.is_none() {
            return Err(Error::Config("native platforms require a token store".into()));
        }

        // Web relies on the backend's HttpOnly cookie riding along automatically.
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(strategy.is_web)
            .build()?;

        let oauth = OAuthClient::new(
            config.client_id.clone(),
            config.scopes.clone(),
            config.redirect_uri(strategy),
        );
        let discovery = config.discovery()?;
        let (state, _) = watch::channel(AuthState::default());

        Ok(Self {
            config,
            strategy,
            oauth,
            discovery,
            prompt,
            store,
            http,
            state,
            pending: Mutex::new(None),
            sign_in_busy: AtomicBool::new(false),
        })
    }

    /// Build, prepare the first authorization request, restore the session.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new). Restore failures are logged, not returned.
    pub async fn init(
        config: ClientConfig,
        platform: Platform,
        prompt: P,
        store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self, Error> {
        let session = Self::new(config, platform, prompt, store)?;
        session.prepare().await;
        session.restore_session().await;
        Ok(session)
    }

    /// Drop the pending PKCE artifact and reset in-memory state.
    ///
    /// The token store is left alone; the next `init` restores from it.
    pub async fn dispose(&self) {
        self.pending.lock().await.take();
        self.state.send_replace(AuthState::default());
    }

    /// Prepare a fresh authorization request for the next [`sign_in`](Self::sign_in).
    pub async fn prepare(&self) {
        let request = self.oauth.build_authorization_request(&self.discovery);
        *self.pending.lock().await = Some(request);
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    // ── Restore ────────────────────────────────────────────────────────

    /// Re-establish the session from persisted credentials.
    ///
    /// Never fails: every error is logged and the state settles to a definite
    /// authenticated or unauthenticated phase with `is_loading = false`.
    /// Anything short of a valid session clears `user` and `access_token`.
    pub async fn restore_session(&self) {
        self.state.send_modify(|s| {
            s.begin(Phase::Restoring);
            s.error = None;
        });

        let outcome = if self.strategy.is_web {
            self.restore_web().await
        } else {
            self.restore_native()
        };
        let restored = outcome.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Session restore failed");
            None
        });

        self.state.send_modify(|s| {
            match restored {
                Some((user, access_token)) => {
                    s.user = Some(user);
                    s.access_token = access_token;
                }
                None => s.clear_session(),
            }
            s.settle();
        });
    }

    async fn restore_web(&self) -> Result<Restored, Error> {
        Ok(self.fetch_session().await?.map(|user| (user, None)))
    }

    fn restore_native(&self) -> Result<Restored, Error> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let key = self.config.token_key();
        let Some(stored) = store.get_token(key) else {
            return Ok(None);
        };

        let user = token::decode(&stored)?.to_user()?;
        if user.is_expired_at(token::unix_now()) {
            tracing::info!("Stored session token expired");
            store.delete_token(key);
            return Ok(None);
        }
        Ok(Some((user, Some(stored))))
    }

    async fn fetch_session(&self) -> Result<Option<AuthUser>, Error> {
        let response = self
            .http
            .get(self.config.endpoint("/api/auth/session")?)
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "No active web session");
            return Ok(None);
        }
        Ok(Some(response.json::<AuthUser>().await?))
    }

    // ── Sign in ────────────────────────────────────────────────────────

    /// Run the interactive prompt and handle its result.
    ///
    /// Without a prepared request this logs and returns `Ok(())`. Every
    /// resolved prompt is followed by a fresh request, so `state` and the
    /// PKCE verifier are never reused across attempts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignInInProgress`] if another sign-in has not finished.
    pub async fn sign_in(&self) -> Result<(), Error> {
        if self.sign_in_busy.swap(true, Ordering::AcqRel) {
            tracing::warn!("Sign-in requested while another is in flight");
            return Err(Error::SignInInProgress);
        }
        let _busy = BusyGuard(&self.sign_in_busy);

        let Some(request) = self.pending.lock().await.take() else {
            tracing::error!("No authorization request prepared");
            return Ok(());
        };

        let response = self.prompt.prompt(&request).await;
        self.handle_response(response, Some(&request)).await;
        self.prepare().await;
        Ok(())
    }

    /// Handle a prompt resolved outside [`sign_in`](Self::sign_in).
    ///
    /// Consumes the pending request (its verifier goes to the exchange) and
    /// prepares a new one.
    pub async fn on_auth_response(&self, response: AuthResponse) {
        let request = self.pending.lock().await.take();
        self.handle_response(response, request.as_ref()).await;
        self.prepare().await;
    }

    /// `Error` is stored for the UI, `Cancel` is a no-op, `Success` exchanges
    /// the code with the backend and installs the resulting session.
    async fn handle_response(&self, response: AuthResponse, request: Option<&AuthorizationRequest>) {
        match response {
            AuthResponse::Error(err) => {
                tracing::warn!(error = %err, "OAuth flow returned an error");
                self.state.send_modify(|s| {
                    s.error = Some(err);
                    if !s.is_loading {
                        s.settle();
                    }
                });
            }
            AuthResponse::Cancel => {
                tracing::debug!("Sign-in cancelled");
            }
            AuthResponse::Success { code, .. } => {
                self.state.send_modify(|s| {
                    s.begin(Phase::SigningIn);
                    s.error = None;
                });

                match self.exchange_code(&code, request).await {
                    Ok(()) => tracing::info!(platform = self.strategy.platform_name(), "Sign-in complete"),
                    Err(Error::ExchangeRejected { status, detail }) => {
                        tracing::error!(status, detail = %detail, "Token exchange rejected");
                        let err = AuthError::new("token_exchange_failed").with_description(detail);
                        self.state.send_modify(|s| s.error = Some(err));
                    }
                    Err(e) => tracing::error!(error = %e, "Token exchange failed"),
                }

                self.state.send_modify(AuthState::settle);
            }
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        request: Option<&AuthorizationRequest>,
    ) -> Result<(), Error> {
        let mut form = multipart::Form::new()
            .text("code", code.to_owned())
            .text("platform", self.strategy.platform_name());
        match request {
            Some(request) => form = form.text("code_verifier", request.code_verifier.clone()),
            None => tracing::warn!("No code verifier found for the pending request"),
        }

        tracing::debug!(
            platform = self.strategy.platform_name(),
            "Exchanging authorization code"
        );
        let response = self
            .http
            .post(self.discovery.token_endpoint.clone())
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        if self.strategy.is_web {
            let body: WebTokenResponse = response.json().await?;
            if !body.success {
                return Err(Error::OAuth("token endpoint did not confirm the session".into()));
            }
            match self.fetch_session().await? {
                Some(user) => self.state.send_modify(|s| s.user = Some(user)),
                None => tracing::warn!("Session lookup failed after sign-in"),
            }
        } else {
            let body: NativeTokenResponse = response.json().await?;
            let user = token::decode(&body.access_token)?.to_user()?;
            if let Some(store) = &self.store {
                store.save_token(self.config.token_key(), &body.access_token);
            }
            self.state.send_modify(|s| {
                s.user = Some(user);
                s.access_token = Some(body.access_token);
            });
        }
        Ok(())
    }

    // ── Sign out ───────────────────────────────────────────────────────

    /// End the session. Always leaves `user`, `access_token` and `error` empty.
    pub async fn sign_out(&self) {
        if self.strategy.is_web {
            if let Err(e) = self.logout_web().await {
                tracing::error!(error = %e, "Error during web logout");
            }
        } else if let Some(store) = &self.store {
            store.delete_token(self.config.token_key());
        }

        self.state.send_modify(|s| {
            s.clear_session();
            s.error = None;
            s.settle();
        });
    }

    async fn logout_web(&self) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.endpoint("/api/auth/logout")?)
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::warn!(status = response.status().as_u16(), "Logout request rejected");
        }
        Ok(())
    }

    // ── Authenticated requests ─────────────────────────────────────────

    /// Send a request carrying the session credential.
    ///
    /// Web requests go through the session's cookie-holding client, so the
    /// backend's HttpOnly session cookie rides along the way fetch's
    /// `credentials: include` would send it; no header is added. Native
    /// requests get `Authorization: Bearer <token>` when a token is held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or timeout.
    pub async fn fetch_with_auth(
        &self,
        url: impl reqwest::IntoUrl,
        options: FetchOptions,
    ) -> Result<reqwest::Response, Error> {
        let access_token = self.state.borrow().access_token.clone();
        let options = self.strategy.authorize(options, access_token.as_deref());

        let mut builder = self.http.request(options.method, url).headers(options.headers);
        if let Some(body) = options.body {
            builder = builder.body(body);
        }
        Ok(builder.send().await?)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Err(Error::ExchangeRejected { status, detail })
}
