use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use super::error::EndpointError;
use super::state::EndpointState;
use crate::token::{self, Claims};
use crate::types::{AuthUser, SessionToken};

/// How the request presented its session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Bearer,
    Cookie,
}

/// Caller with a verified session token.
///
/// Reads `Authorization: Bearer` first (native), then the session cookie
/// (web). Rejects with `401` when neither verifies.
///
/// ```rust,ignore
/// async fn protected(session: SessionUser) -> impl IntoResponse {
///     format!("Hello, {}", session.user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: AuthUser,
    pub claims: Claims,
    pub token: SessionToken,
    pub source: CredentialSource,
}

impl FromRequestParts<EndpointState> for SessionUser {
    type Rejection = EndpointError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &EndpointState,
    ) -> Result<Self, Self::Rejection> {
        let (raw, source) = match bearer_token(parts) {
            Some(raw) => (raw, CredentialSource::Bearer),
            None => {
                let jar = CookieJar::from_headers(&parts.headers);
                let raw = jar
                    .get(state.config.cookie_name())
                    .map(|c| c.value().to_string())
                    .ok_or(EndpointError::Unauthenticated)?;
                (raw, CredentialSource::Cookie)
            }
        };

        let claims = token::verify(&raw, state.config.jwt_secret.as_bytes()).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            EndpointError::Unauthenticated
        })?;
        let user = claims
            .to_user()
            .map_err(|_| EndpointError::Unauthenticated)?;

        Ok(Self {
            user,
            claims,
            token: SessionToken(raw),
            source,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "null" && *t != "undefined")
        .map(str::to_string)
}
