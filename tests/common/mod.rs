#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use quran_auth::server::{ServerConfig, auth_routes};
use quran_auth::token::{self, Claims};
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;

pub const JWT_SECRET: &str = "integration-jwt-secret";
pub const GOOGLE_SUB: &str = "109876543210";
pub const GOOGLE_EMAIL: &str = "reader@example.com";
pub const GOOGLE_NAME: &str = "Quran Reader";

/// Authorization codes understood by the fake provider.
pub const CODE_OK: &str = "4/0good-code";
pub const CODE_REJECTED: &str = "4/0expired-code";
pub const CODE_NO_ID_TOKEN: &str = "4/0no-id-token";

/// Form bodies the fake provider has received, oldest first.
pub type ProviderCalls = Arc<Mutex<Vec<HashMap<String, String>>>>;

pub struct FakeProvider {
    pub token_url: Url,
    pub calls: ProviderCalls,
}

impl FakeProvider {
    pub fn last_call(&self) -> HashMap<String, String> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("provider was never called")
    }
}

/// Bind a router on an ephemeral localhost port and serve it in the background.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An ID token shaped like Google's, carrying its own short `exp`.
pub fn google_id_token() -> String {
    let mut claims = Claims::new();
    claims.insert("iss", "https://accounts.google.com");
    claims.insert("aud", "client.apps.googleusercontent.com");
    claims.insert("email", GOOGLE_EMAIL);
    claims.insert("email_verified", true);
    claims.insert("name", GOOGLE_NAME);
    claims.insert("given_name", "Quran");
    claims.insert("family_name", "Reader");
    claims.insert("picture", "https://lh3.googleusercontent.com/a/photo");
    // Already expired so a leaked provider exp would be visible in the session token.
    token::sign(
        &claims,
        b"provider-private-key",
        Duration::from_secs(60),
        GOOGLE_SUB,
        1_700_000_000,
    )
    .unwrap()
}

async fn provider_token(
    State(calls): State<ProviderCalls>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let code = params.get("code").cloned().unwrap_or_default();
    calls.lock().unwrap().push(params);

    match code.as_str() {
        CODE_OK => Json(json!({
            "access_token": "ya29.provider-access",
            "expires_in": 3599,
            "id_token": google_id_token(),
            "token_type": "Bearer",
        }))
        .into_response(),
        CODE_NO_ID_TOKEN => Json(json!({
            "access_token": "ya29.provider-access",
            "token_type": "Bearer",
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Bad Request" })),
        )
            .into_response(),
    }
}

pub async fn spawn_provider() -> FakeProvider {
    let calls = ProviderCalls::default();
    let router = Router::new()
        .route("/token", post(provider_token))
        .with_state(calls.clone());
    let addr = spawn(router).await;
    FakeProvider {
        token_url: format!("http://{addr}/token").parse().unwrap(),
        calls,
    }
}

pub fn server_config(base_url: Url, token_url: Url) -> ServerConfig {
    ServerConfig::new(
        "client.apps.googleusercontent.com",
        "provider-client-secret",
        base_url,
        "quranapp",
        JWT_SECRET,
    )
    .with_auth_url("https://accounts.example.test/o/oauth2/v2/auth".parse().unwrap())
    .with_token_url(token_url)
}

async fn echo_headers(headers: HeaderMap) -> Json<serde_json::Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({
        "authorization": header("authorization"),
        "cookie": header("cookie"),
    }))
}

/// Serve the auth router (plus a `/echo` route reflecting credentials) and
/// return its base URL.
pub async fn spawn_backend(provider: &FakeProvider) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url: Url = format!("http://{addr}").parse().unwrap();

    let router = auth_routes(server_config(base_url.clone(), provider.token_url.clone()))
        .merge(Router::new().route("/echo", get(echo_headers)));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    base_url
}

/// A backend that accepts connections and never answers.
pub async fn spawn_silent() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{addr}").parse().unwrap()
}
