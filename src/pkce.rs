//! PKCE (RFC 7636) and `state` generation for one authorization round trip.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// The only challenge method this crate sends or defaults to.
pub const CHALLENGE_METHOD: &str = "S256";

/// Verifier kept by the client plus the challenge sent to the authorize URL.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// 48 random bytes, base64url: a 64-char verifier (RFC 7636 allows 43-128).
#[must_use]
pub fn generate_code_verifier() -> String {
    let bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// 16 random bytes, base64url (22 chars). Echoed back on the redirect.
#[must_use]
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn test_verifier_shape() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 64);
        assert!(is_url_safe(&verifier), "verifier should be URL-safe: {verifier}");
    }

    #[test]
    fn test_challenge_matches_rfc7636_appendix_b() {
        assert_eq!(
            generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pair_is_consistent_and_fresh() {
        let pair = PkcePair::generate();
        assert_eq!(pair.challenge, generate_code_challenge(&pair.verifier));
        assert_ne!(pair, PkcePair::generate());
        assert!(!format!("{pair:?}").contains(&pair.verifier));
    }

    #[test]
    fn test_state() {
        let state = generate_state();
        assert_eq!(state.len(), 22);
        assert!(is_url_safe(&state));
        assert_ne!(state, generate_state());
    }
}
