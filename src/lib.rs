#![doc = include_str!("../README.md")]

pub mod error;
#[cfg(feature = "client")]
pub mod oauth;
pub mod pkce;
#[cfg(feature = "client")]
pub mod platform;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "client")]
pub mod session;
#[cfg(feature = "client")]
pub mod store;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use error::Error;
#[cfg(feature = "client")]
pub use oauth::{AuthError, AuthResponse, AuthorizationRequest, BrowserPrompt, DiscoveryDocument};
pub use pkce::{PkcePair, generate_code_challenge, generate_code_verifier, generate_state};
#[cfg(feature = "client")]
pub use platform::{FetchOptions, Platform, Strategy, select_strategy};
#[cfg(feature = "client")]
pub use session::{AuthSession, AuthState, ClientConfig, Phase};
#[cfg(feature = "keyring")]
pub use store::KeyringTokenStore;
#[cfg(feature = "client")]
pub use store::{MemoryTokenStore, TokenStore};
pub use token::{Claims, decode, sign};
pub use types::{AuthUser, SessionToken};
