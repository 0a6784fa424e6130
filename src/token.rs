use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::Error;
use crate::types::AuthUser;

/// The only algorithm session tokens are signed with.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JSON claims carried in a token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims {
    inner: Map<String, JsonValue>,
}

impl Claims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(inner: Map<String, JsonValue>) -> Self {
        Self { inner }
    }

    /// Gets a claim value by key.
    #[must_use]
    pub fn get_claim(&self, key: &str) -> Option<&JsonValue> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.inner.remove(key)
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get_claim("sub").and_then(JsonValue::as_str)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.get_claim("exp").and_then(JsonValue::as_i64)
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.get_claim("iat").and_then(JsonValue::as_i64)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.inner
    }

    /// Project the claims onto an [`AuthUser`].
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedToken` if the claims cannot form a user. Known
    /// claims are read leniently, so a claim's JSON type alone never fails this.
    pub fn to_user(&self) -> Result<AuthUser, Error> {
        serde_json::from_value(JsonValue::Object(self.inner.clone()))
            .map_err(|e| Error::MalformedToken(format!("claims: {e}")))
    }
}

/// Decodes a compact token's payload without verifying its signature.
///
/// Tokens handed to the client come from this app's own backend over a
/// secured channel; the client trusts them as-is.
///
/// # Errors
///
/// Returns `Error::MalformedToken` unless the token has three dot-separated
/// segments whose middle one is base64url-encoded JSON object.
pub fn decode(token: &str) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::MalformedToken("expected three segments".into()));
    };
    if header.is_empty() || payload.is_empty() {
        return Err(Error::MalformedToken("empty segment".into()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::MalformedToken(format!("payload encoding: {e}")))?;

    match serde_json::from_slice::<JsonValue>(&bytes) {
        Ok(JsonValue::Object(inner)) => Ok(Claims { inner }),
        Ok(_) => Err(Error::MalformedToken("payload is not a JSON object".into())),
        Err(e) => Err(Error::MalformedToken(format!("payload JSON: {e}"))),
    }
}

/// Signs `claims` as a session token.
///
/// Any `exp` already present (the identity provider's) is dropped; the token
/// gets `sub = subject`, `iat = issued_at` and `exp = issued_at + expiration`.
///
/// # Errors
///
/// Returns `Error::Config` if `expiration` does not fit in epoch seconds, or
/// `Error::Jwt` if encoding fails.
pub fn sign(
    claims: &Claims,
    secret: &[u8],
    expiration: Duration,
    subject: &str,
    issued_at: i64,
) -> Result<String, Error> {
    let window = i64::try_from(expiration.as_secs())
        .map_err(|_| Error::Config("token validity window out of range".into()))?;

    let mut payload = claims.inner.clone();
    payload.remove("exp");
    payload.insert("sub".into(), subject.into());
    payload.insert("iat".into(), issued_at.into());
    payload.insert("exp".into(), issued_at.saturating_add(window).into());

    let token = jsonwebtoken::encode(
        &Header::new(SIGNING_ALGORITHM),
        &payload,
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}

/// Verifies an HS256 session token and checks `exp`.
///
/// Only the backend holds the secret, so only the backend calls this.
///
/// # Errors
///
/// Returns `Error::Jwt` if the signature, algorithm or expiry check fails.
pub fn verify(token: &str, secret: &[u8]) -> Result<Claims, Error> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.leeway = 0;
    // Provider claims (including `aud`) are carried over verbatim.
    validation.validate_aud = false;
    let data = jsonwebtoken::decode::<Map<String, JsonValue>>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )?;
    Ok(Claims { inner: data.claims })
}

/// Current wall-clock time in epoch seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
