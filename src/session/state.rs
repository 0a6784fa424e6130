use crate::oauth::AuthError;
use crate::types::AuthUser;

/// Lifecycle position of an [`AuthSession`](super::AuthSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Restoring,
    Authenticated,
    Unauthenticated,
    SigningIn,
    Error,
}

/// In-memory auth state, published to observers on every change.
///
/// Never persisted: native keeps only the raw token in the token store, web
/// keeps nothing (the server cookie is the persistence).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub access_token: Option<String>,
    pub is_loading: bool,
    pub error: Option<AuthError>,
    pub phase: Phase,
}

impl AuthState {
    pub(crate) fn begin(&mut self, phase: Phase) {
        self.phase = phase;
        self.is_loading = true;
    }

    /// Ends a loading phase and derives the resting phase from the data.
    pub(crate) fn settle(&mut self) {
        self.is_loading = false;
        self.phase = if self.user.is_some() {
            Phase::Authenticated
        } else if self.error.is_some() {
            Phase::Error
        } else {
            Phase::Unauthenticated
        };
    }

    pub(crate) fn clear_session(&mut self) {
        self.user = None;
        self.access_token = None;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_derives_phase() {
        let mut state = AuthState::default();
        state.begin(Phase::Restoring);
        assert!(state.is_loading);

        state.settle();
        assert_eq!(state.phase, Phase::Unauthenticated);
        assert!(!state.is_loading);

        state.error = Some(AuthError::new("access_denied"));
        state.settle();
        assert_eq!(state.phase, Phase::Error);

        state.user = Some(AuthUser::new("u"));
        state.settle();
        assert_eq!(state.phase, Phase::Authenticated);
    }

    #[test]
    fn clear_session_keeps_error() {
        let mut state = AuthState {
            user: Some(AuthUser::new("u")),
            access_token: Some("t".into()),
            error: Some(AuthError::new("x")),
            ..AuthState::default()
        };
        state.clear_session();
        assert!(state.user.is_none());
        assert!(state.access_token.is_none());
        assert!(state.error.is_some());
    }
}
