//! Authentication service built on the API client
//!
//! Owns the token lifecycle: login persists the token, logout always forgets
//! it, and restore reads it back at startup.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, LearningApi, LoginPayload, RegisterPayload, UserProfile};
use crate::session::{Session, StoreError, TokenStore};

/// Errors from the auth service
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Message to show the learner
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(e) => e.user_message(fallback),
            Self::Store(_) => fallback.to_string(),
        }
    }
}

/// Login/register/logout/current-user on top of a [`LearningApi`]
#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn LearningApi>,
    store: Arc<dyn TokenStore>,
}

impl AuthService {
    pub fn new(api: Arc<dyn LearningApi>, store: Arc<dyn TokenStore>) -> Self {
        Self { api, store }
    }

    /// Create an account; does not log in
    pub async fn register(&self, payload: &RegisterPayload) -> Result<UserProfile, AuthError> {
        debug!(user_id = %payload.user_id, "AuthService::register: called");
        let profile = self.api.register(payload).await?;
        info!("Registered user {}", profile.user_id);
        Ok(profile)
    }

    /// Obtain a token, persist it and return the authenticated session
    pub async fn login(&self, payload: &LoginPayload) -> Result<Session, AuthError> {
        debug!(user_id = %payload.user_id, "AuthService::login: called");
        let token = self.api.login(payload).await?;
        self.store.save(&token.access_token)?;
        info!("Logged in as {}", payload.user_id);
        Ok(Session::with_token(token.access_token))
    }

    /// Resolve the profile of the session's user
    pub async fn current_user(&self, session: &Session) -> Result<UserProfile, AuthError> {
        debug!(authenticated = session.is_authenticated(), "AuthService::current_user: called");
        Ok(self.api.current_user(session).await?)
    }

    /// Invalidate the session server-side and forget the stored token
    ///
    /// The stored token is cleared even when the server call fails; the call
    /// error is still returned.
    pub async fn logout(&self, session: &Session) -> Result<(), AuthError> {
        debug!("AuthService::logout: called");
        let result = self.api.logout(session).await;
        self.forget();
        result.map_err(AuthError::from)
    }

    /// Session from the stored token, if there is one
    pub fn restore(&self) -> Result<Option<Session>, AuthError> {
        debug!("AuthService::restore: called");
        Ok(self.store.load()?.map(Session::with_token))
    }

    /// Make the stored token match the session: saved when it has one,
    /// cleared otherwise
    pub fn sync(&self, session: &Session) {
        debug!(authenticated = session.is_authenticated(), "AuthService::sync: called");
        match session.token() {
            Some(token) => {
                if let Err(e) = self.store.save(token) {
                    warn!("Failed to store token: {}", e);
                }
            }
            None => self.forget(),
        }
    }

    /// Drop the stored token, logging failures
    pub fn forget(&self) {
        debug!("AuthService::forget: called");
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored token: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TokenResponse;
    use crate::api::client::mock::MockApi;
    use crate::session::MemoryTokenStore;

    fn token(value: &str) -> TokenResponse {
        TokenResponse {
            access_token: value.to_string(),
            token_type: "bearer".to_string(),
        }
    }

    fn credentials() -> LoginPayload {
        LoginPayload {
            user_id: "alice".to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_persists_token() {
        let api = Arc::new(MockApi::new().push_login(Ok(token("tok"))));
        let store = Arc::new(MemoryTokenStore::new());
        let auth = AuthService::new(api, store.clone());

        let session = auth.login(&credentials()).await.unwrap();
        assert_eq!(session.token(), Some("tok"));
        assert_eq!(store.load().unwrap(), Some("tok".to_string()));
    }

    #[tokio::test]
    async fn test_failed_login_stores_nothing() {
        let api = Arc::new(MockApi::new().push_login(Err(ApiError::from_body(401, r#"{"detail":"bad"}"#))));
        let store = Arc::new(MemoryTokenStore::new());
        let auth = AuthService::new(api, store.clone());

        let err = auth.login(&credentials()).await.unwrap_err();
        assert_eq!(err.user_message("Unable to log in"), "bad");
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_token_even_on_error() {
        let api = Arc::new(MockApi::new().push_logout(Err(ApiError::from_body(500, ""))));
        let store = Arc::new(MemoryTokenStore::with_token("tok"));
        let auth = AuthService::new(api.clone(), store.clone());

        let result = auth.logout(&Session::with_token("tok")).await;
        assert!(result.is_err());
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(api.calls(), vec!["logout tok".to_string()]);
    }

    #[test]
    fn test_restore_reads_store() {
        let auth = AuthService::new(Arc::new(MockApi::new()), Arc::new(MemoryTokenStore::with_token("x")));
        assert_eq!(auth.restore().unwrap(), Some(Session::with_token("x")));

        let auth = AuthService::new(Arc::new(MockApi::new()), Arc::new(MemoryTokenStore::new()));
        assert_eq!(auth.restore().unwrap(), None);
    }

    #[test]
    fn test_sync_follows_session() {
        let store = Arc::new(MemoryTokenStore::with_token("old"));
        let auth = AuthService::new(Arc::new(MockApi::new()), store.clone());

        auth.sync(&Session::with_token("tok-2"));
        assert_eq!(store.load().unwrap(), Some("tok-2".to_string()));

        auth.sync(&Session::anonymous());
        assert_eq!(store.load().unwrap(), None);
    }
}
