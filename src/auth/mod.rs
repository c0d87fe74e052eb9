use std::fmt;
use std::sync::RwLock;

/// Opaque bearer token attached to outbound commerce-service calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    // Never log token material
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Explicit session context handed to the controller at construction.
///
/// Absence of a token is not an error: profile and cart prefetch are simply
/// skipped, and order submission goes out unauthenticated.
#[derive(Debug, Default)]
pub struct SessionContext {
    token: RwLock<Option<Token>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    pub fn set_token(&self, token: Option<Token>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub fn current_token(&self) -> Option<Token> {
        self.token.read().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_starts_without_token() {
        let session = SessionContext::new();
        assert!(session.current_token().is_none());
    }

    #[test]
    fn test_set_and_clear_token() {
        let session = SessionContext::new();
        session.set_token(Some(Token::new("jwt-abc")));
        assert_eq!(session.current_token().unwrap().as_str(), "jwt-abc");

        session.set_token(None);
        assert!(session.current_token().is_none());
    }

    #[test]
    fn test_token_debug_redacts_material() {
        let token = Token::new("super-secret");
        assert_eq!(format!("{:?}", token), "Token(***)");
    }
}
