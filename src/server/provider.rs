use serde::Deserialize;
use url::Url;

use super::config::ServerConfig;
use crate::error::Error;

/// Body of the identity provider's token response.
///
/// Success and error bodies share one shape; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[non_exhaustive]
pub struct ProviderTokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Confidential client for the identity provider's token endpoint.
pub struct ProviderClient {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl ProviderClient {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: config.token_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.provider_redirect_uri(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Exchange an authorization code with the registered client credentials.
    ///
    /// Error bodies are returned, not raised; the caller inspects `error`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or a non-JSON body.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<ProviderTokenResponse, Error> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ];
        if let Some(verifier) = code_verifier.filter(|v| !v.is_empty()) {
            params.push(("code_verifier", verifier));
        }

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.json::<ProviderTokenResponse>().await?;
        tracing::debug!(status, has_id_token = body.id_token.is_some(), "Provider token response");
        Ok(body)
    }
}
