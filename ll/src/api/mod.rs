//! Client for the adaptive-learning recommendation service
//!
//! Provides the REST surface as a trait plus its reqwest implementation.

pub mod client;
mod error;
mod http;
mod types;

pub use client::LearningApi;
pub use error::{ApiError, extract_detail};
pub use http::HttpApi;
pub use types::{
    Difficulty, Exercise, Interaction, InteractionPayload, LoginPayload, Recommendation, RegisterPayload,
    TokenResponse, UserProfile, parse_timestamp,
};
