use std::env;

use mpx_types::{MpxError, Result};

/// Environment variable [`StaticToken::from_env`] reads.
pub const TOKEN_ENV: &str = "MPX_TOKEN";

/// Placeholder token used while signing in; it is never sent as `token`.
pub const SIGN_IN_TOKEN: &str = "sign_in_token";

/// Source of the token attached to every request.
pub trait TokenProvider: Send + Sync {
    /// The token to send, or `Unauthenticated` when none is held.
    fn current_token(&self) -> Result<String>;
}

/// A fixed token. It is never refreshed.
#[derive(Clone, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: Some(token).filter(|value| !value.trim().is_empty()),
        }
    }

    /// A provider that holds nothing; every request fails as unauthenticated.
    pub fn none() -> Self {
        Self::default()
    }

    /// Reads `MPX_TOKEN`. An unset or blank variable yields [`StaticToken::none`].
    pub fn from_env() -> Self {
        env::var(TOKEN_ENV).map(Self::new).unwrap_or_default()
    }

    pub fn is_set(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TokenProvider for StaticToken {
    fn current_token(&self) -> Result<String> {
        self.token
            .clone()
            .ok_or_else(|| MpxError::unauthenticated(format!("no token held; set {TOKEN_ENV} or sign in first")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_count_as_missing() {
        assert!(!StaticToken::new("   ").is_set());
        assert!(matches!(
            StaticToken::none().current_token(),
            Err(MpxError::Unauthenticated { .. })
        ));
    }

    #[test]
    fn from_env_reads_the_token_variable() {
        temp_env::with_var(TOKEN_ENV, Some("abc123"), || {
            assert_eq!(StaticToken::from_env().current_token().unwrap(), "abc123");
        });
        temp_env::with_var(TOKEN_ENV, None::<&str>, || {
            assert!(!StaticToken::from_env().is_set());
        });
    }

    #[test]
    fn debug_output_hides_the_token() {
        let rendered = format!("{:?}", StaticToken::new("secret-value"));
        assert!(!rendered.contains("secret-value"));
    }
}
