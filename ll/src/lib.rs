//! learnloop - terminal client for an adaptive-learning service
//!
//! The service hands out a short calibration bundle of exercises, records
//! each answer, updates a per-skill mastery estimate and recommends the next
//! exercise. This crate is the learner-facing side.
//!
//! # Modules
//!
//! - [`api`] - wire types, `LearningApi` trait and its HTTP implementation
//! - [`session`] - explicit session value and token persistence
//! - [`auth`] - login, registration, logout and session restore
//! - [`progress`] - per-skill aggregation of the interaction history
//! - [`grading`] - client-side answer checking
//! - [`flow`] - action/outcome orchestration shared by the dashboard
//! - [`report`] - text and JSON rendering for the CLI
//! - [`tui`] - ratatui dashboard
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod flow;
pub mod grading;
pub mod progress;
pub mod report;
pub mod session;
pub mod tui;

pub use api::{ApiError, HttpApi, LearningApi};
pub use auth::{AuthError, AuthService};
pub use config::Config;
pub use flow::{Action, Flow, FlowContext, FlowState, Phase};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
