use std::time::Duration as StdDuration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// HttpOnly, `SameSite=Lax`, `Path=/` cookie carrying the session token.
pub(super) fn session_cookie(
    name: &str,
    token: &str,
    validity: StdDuration,
    secure: bool,
) -> Cookie<'static> {
    let max_age = i64::try_from(validity.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((name.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age))
        .build()
}

/// Create removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
