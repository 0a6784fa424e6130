#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Token is not three dot-separated base64url segments with a JSON object payload.
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("OAuth2 error: {0}")]
    OAuth(String),
    /// Backend answered the code exchange with a non-2xx status.
    #[error("Token exchange rejected ({status}): {detail}")]
    ExchangeRejected { status: u16, detail: String },
    /// An interactive prompt is already waiting on the browser.
    #[error("Sign-in already in progress")]
    SignInInProgress,
}
