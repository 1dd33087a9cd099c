//! Token acquisition seam
//!
//! Token acquisition (login flows, keyrings, credential storage) lives
//! outside this crate. The toolkit only needs a bearer token and a way
//! to drop one the platform has rejected.

use std::sync::Mutex;

use crate::core::error::FolioError;

/// Opaque source of API tokens.
pub trait TokenProvider: Send + Sync {
    /// Return a token believed to be valid, or `AuthExpired` when no
    /// usable token is available.
    fn get_token(&self) -> Result<String, FolioError>;

    /// Called when the platform rejects the current token.
    fn invalidate(&self);
}

/// Token fixed at startup from configuration or the environment.
pub struct StaticToken {
    token: Mutex<Option<String>>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenProvider for StaticToken {
    fn get_token(&self) -> Result<String, FolioError> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(FolioError::AuthExpired)
    }

    fn invalidate(&self) {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_returns_value() {
        let provider = StaticToken::new("t0ken");
        assert_eq!(provider.get_token().unwrap(), "t0ken");
    }

    #[test]
    fn test_invalidated_token_reports_auth_expired() {
        let provider = StaticToken::new("t0ken");
        provider.invalidate();
        assert!(matches!(provider.get_token(), Err(FolioError::AuthExpired)));
    }
}
