pub mod jwt;
pub mod store;

use crate::error::CoreError;
use crate::model::UserId;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use jwt::JwtDecoder;
pub use store::{FileCredentialStore, MemoryCredentialStore};

/// Key under which the sign-in flow persists the session token.
pub const DEFAULT_CREDENTIAL_KEY: &str = "authToken";

/// Persisted key-value credentials written by the sign-in flow.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Claims {
    /// The username claim, falling back to the subject.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        [self.username.as_deref(), self.sub.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(UserId::new)
    }
}

pub trait TokenDecoder: Send + Sync {
    /// # Errors
    /// `Decode` when the token is malformed.
    fn decode(&self, token: &str) -> Result<Claims, CoreError>;
}

/// Turns the stored credential into the id that scopes scorecard lookups.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn CredentialStore>,
    decoder: Arc<dyn TokenDecoder>,
    key: String,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        decoder: Arc<dyn TokenDecoder>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            decoder,
            key: key.into(),
        }
    }

    /// `None` means there is no session to load; it is never an error.
    #[must_use]
    pub fn resolve_current_user(&self) -> Option<UserId> {
        let Some(token) = self.store.get(&self.key) else {
            log::debug!("no credential stored under {}", self.key);
            return None;
        };
        match self.decoder.decode(&token) {
            Ok(claims) => {
                let user = claims.user_id();
                if user.is_none() {
                    log::warn!("credential token carries neither username nor subject");
                }
                user
            }
            Err(e) => {
                log::warn!("could not decode stored credential: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDecoder(Result<Claims, CoreError>);

    impl TokenDecoder for FixedDecoder {
        fn decode(&self, _token: &str) -> Result<Claims, CoreError> {
            self.0.clone()
        }
    }

    fn claims(username: Option<&str>, sub: Option<&str>) -> Claims {
        Claims {
            username: username.map(str::to_string),
            sub: sub.map(str::to_string),
            exp: None,
            other: Map::new(),
        }
    }

    fn resolver(token: Option<&str>, decoded: Result<Claims, CoreError>) -> IdentityResolver {
        let store = MemoryCredentialStore::default();
        if let Some(token) = token {
            store.set(DEFAULT_CREDENTIAL_KEY, token);
        }
        IdentityResolver::new(
            Arc::new(store),
            Arc::new(FixedDecoder(decoded)),
            DEFAULT_CREDENTIAL_KEY,
        )
    }

    #[test]
    fn resolves_username_then_subject() {
        let r = resolver(Some("t"), Ok(claims(Some("ann"), Some("42"))));
        assert_eq!(r.resolve_current_user(), Some(UserId::new("ann")));

        let r = resolver(Some("t"), Ok(claims(Some(""), Some("42"))));
        assert_eq!(r.resolve_current_user(), Some(UserId::new("42")));

        let r = resolver(Some("t"), Ok(claims(None, None)));
        assert_eq!(r.resolve_current_user(), None);
    }

    #[test]
    fn missing_or_broken_token_means_no_user() {
        let r = resolver(None, Ok(claims(Some("ann"), None)));
        assert_eq!(r.resolve_current_user(), None);

        let r = resolver(Some("garbage"), Err(CoreError::Decode("bad".into())));
        assert_eq!(r.resolve_current_user(), None);
    }
}
