//! Session state: endpoint, token and the last recorded error.

/// Whether the session currently holds a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token; only `logon` may be sent.
    Unauthenticated,
    /// A token is held and attached to every command.
    Authenticated,
}

/// Mutable per-client session data.
///
/// The token is empty until a successful login and is cleared by logout.
/// `last_error` is a diagnostic side channel, overwritten by each failing
/// call; operations report failures through their return values.
#[derive(Clone, Default)]
pub struct Session {
    endpoint: String,
    token: String,
    last_error: Option<String>,
}

impl Session {
    /// Create a session for an endpoint with no token.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// The base URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    /// The session token, empty when logged out.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// Drop the token, returning to `Unauthenticated`.
    pub fn clear_token(&mut self) {
        self.token.clear();
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// The current point in the token lifecycle.
    pub fn state(&self) -> SessionState {
        if self.token.is_empty() {
            SessionState::Unauthenticated
        } else {
            SessionState::Authenticated
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new("https://example.fogbugz.com/api.asp");
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.token(), "");
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn test_token_lifecycle() {
        let mut session = Session::new("https://example.fogbugz.com/api.asp");
        session.set_token("abc");
        assert_eq!(session.state(), SessionState::Authenticated);
        session.clear_token();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        session.clear_token();
        assert_eq!(session.token(), "");
    }

    #[test]
    fn test_last_error_is_overwritten() {
        let mut session = Session::default();
        session.set_last_error("first");
        session.set_last_error("second");
        assert_eq!(session.last_error(), Some("second"));
    }

    #[test]
    fn test_debug_does_not_expose_token() {
        let mut session = Session::new("https://example.fogbugz.com/api.asp");
        session.set_token("secret_token");
        let debug_output = format!("{:?}", session);
        assert!(!debug_output.contains("secret_token"));
        assert!(debug_output.contains("Authenticated"));
    }
}
