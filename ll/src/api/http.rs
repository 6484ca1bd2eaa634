//! reqwest implementation of the LearningApi trait

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    ApiError, Exercise, Interaction, InteractionPayload, LearningApi, LoginPayload, Recommendation, RegisterPayload,
    TokenResponse, UserProfile,
};
use crate::config::ApiConfig;
use crate::session::Session;

/// HTTP client for the recommendation service
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: Url,
    http: Client,
}

impl HttpApi {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        debug!(%base_url, ?timeout, "HttpApi::new: called");
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Network)?;

        Ok(Self { base_url, http })
    }

    /// Create a client from configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        debug!(?config, "HttpApi::from_config: called");
        Self::new(&config.base_url, Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments (segments are percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        debug!(%url, "HttpApi::endpoint: built");
        Ok(url)
    }

    fn authorize(request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.authorization() {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    /// Send a request and decode a JSON body
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(error = %e, "HttpApi::send_json: decode failed");
            ApiError::Json(e)
        })
    }

    /// Send a request, returning the body of a successful response
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "HttpApi::send: error status");
            return Err(ApiError::from_body(status.as_u16(), &body));
        }

        debug!(status = status.as_u16(), body_len = body.len(), "HttpApi::send: success");
        Ok(body)
    }
}

#[async_trait]
impl LearningApi for HttpApi {
    async fn initial_exercises(&self, session: &Session) -> Result<Vec<Exercise>, ApiError> {
        debug!("HttpApi::initial_exercises: called");
        let url = self.endpoint(&["exercises", "initial"])?;
        self.send_json(Self::authorize(self.http.get(url), session)).await
    }

    async fn submit_interaction(
        &self,
        session: &Session,
        payload: &InteractionPayload,
    ) -> Result<Interaction, ApiError> {
        debug!(exercise_id = %payload.exercise_id, correct = payload.correct, "HttpApi::submit_interaction: called");
        // Trailing slash matters: the service routes `/interactions/`
        let url = self.endpoint(&["interactions", ""])?;
        self.send_json(Self::authorize(self.http.post(url).json(payload), session))
            .await
    }

    async fn next_recommendation(&self, session: &Session, user_id: &str) -> Result<Recommendation, ApiError> {
        debug!(%user_id, "HttpApi::next_recommendation: called");
        let url = self.endpoint(&["recommendations", "next"])?;
        let request = self.http.get(url).query(&[("user_id", user_id)]);
        self.send_json(Self::authorize(request, session)).await
    }

    async fn history(&self, session: &Session, user_id: &str) -> Result<Vec<Interaction>, ApiError> {
        debug!(%user_id, "HttpApi::history: called");
        let url = self.endpoint(&["students", user_id, "history"])?;
        self.send_json(Self::authorize(self.http.get(url), session)).await
    }

    async fn register(&self, payload: &RegisterPayload) -> Result<UserProfile, ApiError> {
        debug!(user_id = %payload.user_id, "HttpApi::register: called");
        let url = self.endpoint(&["auth", "register"])?;
        self.send_json(self.http.post(url).json(payload)).await
    }

    async fn login(&self, payload: &LoginPayload) -> Result<TokenResponse, ApiError> {
        debug!(user_id = %payload.user_id, "HttpApi::login: called");
        let url = self.endpoint(&["auth", "login"])?;
        self.send_json(self.http.post(url).json(payload)).await
    }

    async fn current_user(&self, session: &Session) -> Result<UserProfile, ApiError> {
        debug!("HttpApi::current_user: called");
        let url = self.endpoint(&["auth", "me"])?;
        self.send_json(Self::authorize(self.http.get(url), session)).await
    }

    async fn logout(&self, session: &Session) -> Result<(), ApiError> {
        debug!("HttpApi::logout: called");
        let url = self.endpoint(&["auth", "logout"])?;
        self.send(Self::authorize(self.http.post(url), session)).await?;
        Ok(())
    }
}
