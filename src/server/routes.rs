use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::config::{CallerPlatform, ServerConfig};
use super::cookies;
use super::error::EndpointError;
use super::extractor::SessionUser;
use super::form::TokenForm;
use super::state::EndpointState;
use crate::{pkce, token};
use crate::types::AuthUser;

/// Create the auth router talking to the configured identity provider.
pub fn auth_routes(config: ServerConfig) -> Router {
    auth_router(EndpointState::new(config))
}

/// Create the auth router from prepared state.
pub fn auth_router(state: EndpointState) -> Router {
    let auth_path = state.config.settings.auth_path.clone();

    Router::new()
        .route(&format!("{auth_path}/authorize"), get(authorize))
        .route(&format!("{auth_path}/callback"), get(callback))
        .route(&format!("{auth_path}/token"), post(issue_token))
        .route(&format!("{auth_path}/session"), get(session))
        .route(&format!("{auth_path}/logout"), post(logout))
        .route("/api/protected/data", get(protected_data))
        .with_state(state)
}

// ── Authorize ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AuthorizeParams {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    state: Option<String>,
    scope: Option<String>,
    code_challenge: Option<String>,
    code_challenge_method: Option<String>,
}

async fn authorize(
    State(state): State<EndpointState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Redirect, EndpointError> {
    let config = &state.config;
    if params.client_id.as_deref() != Some(config.settings.internal_client_id.as_str()) {
        return Err(EndpointError::InvalidClient);
    }

    let redirect_uri = params
        .redirect_uri
        .ok_or(EndpointError::InvalidRedirectUri)?;
    let platform = config
        .classify_redirect(&redirect_uri)
        .ok_or(EndpointError::InvalidRedirectUri)?;

    let combined_state = format!(
        "{}|{}",
        platform.as_str(),
        params.state.as_deref().unwrap_or_default()
    );
    let scope = params.scope.as_deref().unwrap_or("openid profile email");
    let provider_redirect = config.provider_redirect_uri();

    let mut url = config.auth_url.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.google_client_id)
            .append_pair("redirect_uri", &provider_redirect)
            .append_pair("response_type", "code")
            .append_pair("scope", scope)
            .append_pair("state", &combined_state)
            .append_pair("prompt", "select_account");
        if let Some(challenge) = params.code_challenge.as_deref() {
            query
                .append_pair("code_challenge", challenge)
                .append_pair(
                    "code_challenge_method",
                    params
                        .code_challenge_method
                        .as_deref()
                        .unwrap_or(pkce::CHALLENGE_METHOD),
                );
        }
    }

    tracing::debug!(platform = platform.as_str(), "Redirecting to identity provider");
    Ok(Redirect::to(url.as_str()))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<EndpointState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, EndpointError> {
    let combined = params.state.ok_or(EndpointError::InvalidState)?;
    let (platform, original_state) = combined
        .split_once('|')
        .ok_or(EndpointError::InvalidState)?;

    let target = match platform {
        p if p == CallerPlatform::Web.as_str() => state.config.web_origin(),
        p if p == CallerPlatform::Mobile.as_str() => state.config.app_redirect(),
        _ => return Err(EndpointError::InvalidState),
    };
    let mut url = Url::parse(&target).map_err(|_| EndpointError::InvalidRedirectUri)?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(code) = params.code.as_deref() {
            query.append_pair("code", code);
        }
        query.append_pair("state", original_state);
        if let Some(error) = params.error.as_deref() {
            tracing::warn!(error, "Identity provider returned an error to the callback");
            query.append_pair("error", error);
            if let Some(desc) = params.error_description.as_deref() {
                query.append_pair("error_description", desc);
            }
        }
    }

    Ok(Redirect::to(url.as_str()))
}

// ── Token ──────────────────────────────────────────────────────────

async fn issue_token(
    State(state): State<EndpointState>,
    jar: CookieJar,
    form: TokenForm,
) -> Result<Response, EndpointError> {
    let code = form
        .code
        .filter(|c| !c.is_empty())
        .ok_or(EndpointError::MissingCode)?;
    let platform = form.platform.unwrap_or_else(|| "native".into());

    let data = state
        .provider
        .exchange_code(&code, form.code_verifier.as_deref())
        .await
        .map_err(|e| EndpointError::ProviderUnavailable(e.to_string()))?;

    if let Some(error) = data.error {
        tracing::warn!(error = %error, "Identity provider rejected the authorization code");
        return Err(EndpointError::ProviderExchange {
            error,
            error_description: data.error_description,
        });
    }
    let id_token = data.id_token.ok_or(EndpointError::MissingIdentityToken)?;

    let provider_claims = token::decode(&id_token)?;
    let subject = provider_claims
        .subject()
        .ok_or(EndpointError::MissingIdentityToken)?
        .to_owned();

    let settings = &state.config.settings;
    let issued_at = token::unix_now();
    let access_token = token::sign(
        &provider_claims,
        state.config.jwt_secret.as_bytes(),
        settings.token_validity,
        &subject,
        issued_at,
    )?;

    if platform == "web" {
        let cookie = cookies::session_cookie(
            &settings.cookie_name,
            &access_token,
            settings.token_validity,
            settings.secure_cookies,
        );
        let expires_at = issued_at.saturating_add_unsigned(settings.token_validity.as_secs());
        tracing::info!(platform = %platform, "Session token issued");
        return Ok((
            jar.add(cookie),
            Json(json!({
                "success": true,
                "issuedAt": issued_at,
                "expiresAt": expires_at,
            })),
        )
            .into_response());
    }

    tracing::info!(platform = %platform, "Session token issued");
    Ok(Json(json!({ "access_token": access_token })).into_response())
}

// ── Session ────────────────────────────────────────────────────────

async fn session(session: SessionUser) -> Json<AuthUser> {
    let mut user = session.user;
    user.cookie_expiration = user.exp;
    Json(user)
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(State(state): State<EndpointState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let clear_cookie = cookies::clear_session_cookie(state.config.cookie_name());
    (jar.add(clear_cookie), Json(json!({ "success": true })))
}

// ── Protected ──────────────────────────────────────────────────────

async fn protected_data(session: SessionUser) -> Json<Value> {
    Json(json!({
        "message": "Hello, world!",
        "user": { "name": session.user.name, "email": session.user.email },
    }))
}
