//! Backend auth endpoints for Axum.
//!
//! The token endpoint is the trusted exchange point: it trades the
//! authorization code with Google, mints the app's own session token, and
//! hands it back as an HttpOnly cookie (web) or in the body (native).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use quran_auth::server::{ServerConfig, auth_routes};
//!
//! let config = ServerConfig::from_env()?;
//! let app = axum::Router::new().merge(auth_routes(config));
//! axum::serve(listener, app).await?;
//! ```
//!
//! Routes (under the auth path, default `/api/auth`):
//! `GET authorize`, `GET callback`, `POST token`, `GET session`,
//! `POST logout`, plus `GET /api/protected/data`.

mod config;
mod cookies;
mod error;
mod extractor;
mod form;
mod provider;
mod routes;
mod state;

pub use config::{SESSION_VALIDITY, ServerConfig};
pub use error::EndpointError;
pub use extractor::{CredentialSource, SessionUser};
pub use provider::{ProviderClient, ProviderTokenResponse};
pub use routes::{auth_router, auth_routes};
pub use state::EndpointState;
