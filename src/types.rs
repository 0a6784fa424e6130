use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Application-minted session token (compact JWT).
///
/// Same payload whether it travels as a native bearer token or inside the
/// web session cookie.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Decoded identity claims.
///
/// Always a projection of the current session token; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AuthUser {
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sub: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub picture: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub given_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub family_name: Option<String>,
    /// Google sends this as a bool or as `"true"`/`"false"`.
    #[serde(
        default,
        deserialize_with = "lenient::opt_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub email_verified: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub provider: Option<String>,
    /// Expiry, epoch seconds.
    #[serde(
        default,
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
    /// Web only: expiry of the session cookie as reported by the session endpoint.
    #[serde(
        default,
        rename = "cookieExpiration",
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub cookie_expiration: Option<i64>,
    /// Remaining claims (`iat`, `iss`, `aud`, ...).
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AuthUser {
    /// Create a user with only the subject set.
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            id: None,
            sub: sub.into(),
            email: String::new(),
            name: String::new(),
            picture: None,
            given_name: None,
            family_name: None,
            email_verified: None,
            provider: None,
            exp: None,
            cookie_expiration: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_exp(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Subject identifier: `sub`, falling back to `id`.
    #[must_use]
    pub fn subject(&self) -> &str {
        match (&self.sub, &self.id) {
            (sub, Some(id)) if sub.is_empty() => id,
            (sub, _) => sub,
        }
    }

    /// A missing `exp` counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_none_or(|exp| exp <= now)
    }
}

/// Claim decoding that never fails on a value's JSON type.
///
/// A well-formed token is a session whatever its provider put in the known
/// claims; values that cannot be read as the field type become empty.
mod lenient {
    use super::{Deserialize, Deserializer, JsonValue};

    fn text(value: JsonValue) -> Option<String> {
        match value {
            JsonValue::String(s) => Some(s),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(JsonValue::deserialize(d)?).unwrap_or_default())
    }

    pub(super) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(text(JsonValue::deserialize(d)?))
    }

    pub(super) fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match JsonValue::deserialize(d)? {
            JsonValue::Bool(b) => Some(b),
            JsonValue::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
            _ => None,
        })
    }

    pub(super) fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match JsonValue::deserialize(d)? {
            JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }
}
