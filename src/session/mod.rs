//! Client-side auth session.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quran_auth::platform::Platform;
//! use quran_auth::session::{AuthSession, ClientConfig};
//! use quran_auth::store::MemoryTokenStore;
//!
//! let (prompt, redirects) = quran_auth::oauth::channel_prompt(|url: &url::Url| open_browser(url));
//! let session = AuthSession::init(
//!     ClientConfig::from_env()?,
//!     Platform::current(),
//!     prompt,
//!     Some(Arc::new(MemoryTokenStore::new())),
//! )
//! .await?;
//!
//! // host runtime: redirects.redirect(deep_link).await when the browser returns
//! session.sign_in().await?;
//! let response = session.fetch_with_auth(url, FetchOptions::get()).await?;
//! ```

mod config;
mod manager;
mod state;

pub use config::{ClientConfig, TOKEN_KEY_NAME};
pub use manager::AuthSession;
pub use state::{AuthState, Phase};
