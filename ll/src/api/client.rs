//! LearningApi trait definition

use async_trait::async_trait;
#[allow(unused_imports)]
use tracing::debug;

use super::{
    ApiError, Exercise, Interaction, InteractionPayload, LoginPayload, Recommendation, RegisterPayload,
    TokenResponse, UserProfile,
};
use crate::session::Session;

/// The REST surface of the recommendation service
///
/// Each call is independent. Authenticated calls take the session they run
/// under, so no token lives anywhere but in the caller's hands.
#[async_trait]
pub trait LearningApi: Send + Sync {
    /// `GET /exercises/initial` - the calibration bundle
    async fn initial_exercises(&self, session: &Session) -> Result<Vec<Exercise>, ApiError>;

    /// `POST /interactions/` - record an answered exercise
    async fn submit_interaction(
        &self,
        session: &Session,
        payload: &InteractionPayload,
    ) -> Result<Interaction, ApiError>;

    /// `GET /recommendations/next?user_id=` - next exercise or mastery signal
    async fn next_recommendation(&self, session: &Session, user_id: &str) -> Result<Recommendation, ApiError>;

    /// `GET /students/{user_id}/history` - past interactions
    async fn history(&self, session: &Session, user_id: &str) -> Result<Vec<Interaction>, ApiError>;

    /// `POST /auth/register`
    async fn register(&self, payload: &RegisterPayload) -> Result<UserProfile, ApiError>;

    /// `POST /auth/login`
    async fn login(&self, payload: &LoginPayload) -> Result<TokenResponse, ApiError>;

    /// `GET /auth/me`
    async fn current_user(&self, session: &Session) -> Result<UserProfile, ApiError>;

    /// `POST /auth/logout`
    async fn logout(&self, session: &Session) -> Result<(), ApiError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing::debug;

    type Queue<T> = Mutex<VecDeque<Result<T, ApiError>>>;

    /// Scripted API for unit tests
    ///
    /// Each endpoint pops the next queued response; an empty queue yields an
    /// `InvalidResponse` error. Every call is recorded as `"<endpoint> <token>"`.
    #[derive(Default)]
    pub struct MockApi {
        exercises: Queue<Vec<Exercise>>,
        interactions: Queue<Interaction>,
        recommendations: Queue<Recommendation>,
        histories: Queue<Vec<Interaction>>,
        registrations: Queue<UserProfile>,
        logins: Queue<TokenResponse>,
        profiles: Queue<UserProfile>,
        logouts: Queue<()>,
        calls: Mutex<Vec<String>>,
        submitted: Mutex<Vec<InteractionPayload>>,
    }

    fn pop<T>(queue: &Queue<T>, endpoint: &str) -> Result<T, ApiError> {
        let mut queue = queue.lock().unwrap();
        queue.pop_front().unwrap_or_else(|| {
            debug!(%endpoint, "MockApi: no more mock responses");
            Err(ApiError::InvalidResponse(format!("No more mock responses for {}", endpoint)))
        })
    }

    fn push<T>(queue: &Queue<T>, value: Result<T, ApiError>) {
        queue.lock().unwrap().push_back(value);
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_exercises(self, value: Result<Vec<Exercise>, ApiError>) -> Self {
            push(&self.exercises, value);
            self
        }

        pub fn push_interaction(self, value: Result<Interaction, ApiError>) -> Self {
            push(&self.interactions, value);
            self
        }

        pub fn push_recommendation(self, value: Result<Recommendation, ApiError>) -> Self {
            push(&self.recommendations, value);
            self
        }

        pub fn push_history(self, value: Result<Vec<Interaction>, ApiError>) -> Self {
            push(&self.histories, value);
            self
        }

        pub fn push_registration(self, value: Result<UserProfile, ApiError>) -> Self {
            push(&self.registrations, value);
            self
        }

        pub fn push_login(self, value: Result<TokenResponse, ApiError>) -> Self {
            push(&self.logins, value);
            self
        }

        pub fn push_profile(self, value: Result<UserProfile, ApiError>) -> Self {
            push(&self.profiles, value);
            self
        }

        pub fn push_logout(self, value: Result<(), ApiError>) -> Self {
            push(&self.logouts, value);
            self
        }

        /// Recorded calls in order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Interaction payloads submitted so far
        pub fn submitted(&self) -> Vec<InteractionPayload> {
            self.submitted.lock().unwrap().clone()
        }

        fn record(&self, endpoint: &str, session: Option<&Session>) {
            let token = session.and_then(|s| s.token()).unwrap_or("-");
            self.calls.lock().unwrap().push(format!("{} {}", endpoint, token));
        }
    }

    #[async_trait]
    impl LearningApi for MockApi {
        async fn initial_exercises(&self, session: &Session) -> Result<Vec<Exercise>, ApiError> {
            self.record("initial_exercises", Some(session));
            pop(&self.exercises, "initial_exercises")
        }

        async fn submit_interaction(
            &self,
            session: &Session,
            payload: &InteractionPayload,
        ) -> Result<Interaction, ApiError> {
            self.record("submit_interaction", Some(session));
            self.submitted.lock().unwrap().push(payload.clone());
            pop(&self.interactions, "submit_interaction")
        }

        async fn next_recommendation(&self, session: &Session, _user_id: &str) -> Result<Recommendation, ApiError> {
            self.record("next_recommendation", Some(session));
            pop(&self.recommendations, "next_recommendation")
        }

        async fn history(&self, session: &Session, _user_id: &str) -> Result<Vec<Interaction>, ApiError> {
            self.record("history", Some(session));
            pop(&self.histories, "history")
        }

        async fn register(&self, _payload: &RegisterPayload) -> Result<UserProfile, ApiError> {
            self.record("register", None);
            pop(&self.registrations, "register")
        }

        async fn login(&self, _payload: &LoginPayload) -> Result<TokenResponse, ApiError> {
            self.record("login", None);
            pop(&self.logins, "login")
        }

        async fn current_user(&self, session: &Session) -> Result<UserProfile, ApiError> {
            self.record("current_user", Some(session));
            pop(&self.profiles, "current_user")
        }

        async fn logout(&self, session: &Session) -> Result<(), ApiError> {
            self.record("logout", Some(session));
            pop(&self.logouts, "logout")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_returns_queued_then_errors() {
            let api = MockApi::new().push_logout(Ok(()));
            let session = Session::with_token("t1");

            assert!(api.logout(&session).await.is_ok());
            assert!(api.logout(&session).await.is_err());
            assert_eq!(api.calls(), vec!["logout t1".to_string(), "logout t1".to_string()]);
        }
    }
}
