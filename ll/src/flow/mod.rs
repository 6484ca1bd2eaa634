//! Orchestration of the learner flow
//!
//! [`Flow`] owns the [`FlowState`] and is the only thing that mutates it.
//! Each user action goes through three steps:
//!
//! 1. `prepare` validates the action against the state and captures a [`Job`]
//! 2. the job runs its requests (inline, or on a spawned task in the TUI)
//! 3. `apply` folds the [`Outcome`] back into the state
//!
//! Actions are single-flight: while a request sequence is in flight, new
//! actions other than logout are refused. Logout and a successful login start
//! a new epoch, and outcomes prepared in an older epoch are discarded, so a
//! late response can never resurrect a finished session.

mod job;
mod state;

use std::sync::Arc;

use tracing::{debug, info, warn};

pub use job::{Action, AnswerNext, Job, Outcome, OutcomeKind};
pub use state::{
    FlowState, MSG_LOGIN_FAILED, MSG_LOGIN_REQUIRED, MSG_NO_RECOMMENDATION, MSG_REGISTER_FAILED, MSG_SESSION_EXPIRED, Phase,
    mastery_text,
};

use crate::api::LearningApi;
use crate::auth::AuthService;
use crate::grading;
use crate::session::TokenStore;
use job::JobKind;

/// Collaborators a job needs; cheap to clone into a spawned task
#[derive(Clone)]
pub struct FlowContext {
    pub api: Arc<dyn LearningApi>,
    pub auth: AuthService,
}

impl FlowContext {
    pub fn new(api: Arc<dyn LearningApi>, store: Arc<dyn TokenStore>) -> Self {
        let auth = AuthService::new(api.clone(), store);
        Self { api, auth }
    }
}

/// State plus the context to act on it
pub struct Flow {
    state: FlowState,
    ctx: FlowContext,
}

impl Flow {
    pub fn new(ctx: FlowContext) -> Self {
        debug!("Flow::new: called");
        Self {
            state: FlowState::new(),
            ctx,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    /// Dismiss the visible error messages
    pub fn clear_errors(&mut self) {
        self.state.error = None;
        self.state.auth_error = None;
    }

    /// Validate an action and capture the job that performs it
    ///
    /// Returns `None` when the action needs no request or was refused; any
    /// message for the learner is already in the state.
    pub fn prepare(&mut self, action: Action) -> Option<Job> {
        debug!(action = action.name(), epoch = self.state.epoch, "Flow::prepare: called");
        let state = &mut self.state;
        let epoch = state.epoch;

        if state.auth_busy && action != Action::Logout {
            debug!("Flow::prepare: auth request in flight, refusing");
            return None;
        }

        let kind = match action {
            Action::RestoreSession => match self.ctx.auth.restore() {
                Ok(Some(session)) => {
                    state.auth_busy = true;
                    state.auth_error = None;
                    JobKind::Restore { session }
                }
                Ok(None) => {
                    debug!("Flow::prepare: no stored token");
                    state.token_checked = true;
                    return None;
                }
                Err(e) => {
                    warn!("Failed to read stored token: {}", e);
                    state.token_checked = true;
                    return None;
                }
            },
            Action::Login(payload) => {
                if state.busy {
                    return None;
                }
                state.auth_busy = true;
                state.auth_error = None;
                JobKind::Login { payload }
            }
            Action::Register(payload) => {
                if state.busy {
                    return None;
                }
                state.auth_busy = true;
                state.auth_error = None;
                JobKind::Register { payload }
            }
            Action::Logout => {
                let session = state.session.clone();
                state.logout();
                if !session.is_authenticated() {
                    self.ctx.auth.forget();
                    return None;
                }
                // Runs under the new epoch; the outcome touches no learner state
                return Some(Job::new(state.epoch, JobKind::Logout { session }));
            }
            Action::ReloadBundle => {
                if state.busy || state.user.is_none() {
                    return None;
                }
                state.busy = true;
                state.error = None;
                JobKind::Bundle {
                    session: state.session.clone(),
                }
            }
            Action::Answer(given) => {
                let Some(user_id) = state.user_id().map(str::to_string) else {
                    state.error = Some(MSG_LOGIN_REQUIRED.to_string());
                    return None;
                };
                if state.busy || given.trim().is_empty() {
                    return None;
                }
                let Some(exercise) = state.current_exercise() else {
                    debug!("Flow::prepare: no current exercise");
                    return None;
                };
                let payload = grading::build_payload(&user_id, exercise, &given);
                let fetch_recommendation = state.bundle_index + 1 >= state.bundle.len();
                state.busy = true;
                state.error = None;
                JobKind::Answer {
                    session: state.session.clone(),
                    user_id,
                    payload,
                    fetch_recommendation,
                }
            }
            Action::RefreshRecommendation => {
                let user_id = state.user_id()?.to_string();
                if state.busy {
                    return None;
                }
                state.busy = true;
                state.error = None;
                JobKind::Recommendation {
                    session: state.session.clone(),
                    user_id,
                }
            }
            Action::RefreshHistory => {
                let user_id = state.user_id()?.to_string();
                JobKind::History {
                    session: state.session.clone(),
                    user_id,
                }
            }
        };

        Some(Job::new(epoch, kind))
    }

    /// Fold a finished job into the state
    pub fn apply(&mut self, outcome: Outcome) {
        debug!(epoch = outcome.epoch, current = self.state.epoch, "Flow::apply: called");
        let state = &mut self.state;
        // Auth jobs write the token store while they run, in whatever order
        // they finish; once applied, the stored token must match the session
        let touches_store = matches!(
            outcome.kind,
            OutcomeKind::SessionStarted { .. } | OutcomeKind::AuthFailed(_) | OutcomeKind::LoggedOut(_)
        );

        if outcome.epoch != state.epoch {
            if let OutcomeKind::LoggedOut(Err(e)) = &outcome.kind {
                warn!("Logout request failed: {}", e);
            }
            if touches_store {
                self.ctx.auth.sync(&state.session);
            }
            debug!(epoch = outcome.epoch, "Flow::apply: stale outcome discarded");
            return;
        }

        match outcome.kind {
            OutcomeKind::SessionStarted {
                session,
                user,
                bundle,
                history,
            } => state.start_session(session, user, bundle, history),
            OutcomeKind::AuthFailed(message) => state.auth_failed(message),
            OutcomeKind::LoggedOut(result) => match result {
                Ok(()) => info!("Logged out"),
                Err(e) => warn!("Logout request failed: {}", e),
            },
            OutcomeKind::BundleLoaded(bundle) => {
                state.busy = false;
                state.apply_bundle(bundle);
            }
            OutcomeKind::Answered { history, next } => {
                state.busy = false;
                if let Some(history) = history {
                    state.history = history;
                }
                state.mastery_message = None;
                match next {
                    AnswerNext::Advance => state.bundle_index += 1,
                    AnswerNext::Recommendation(result) => {
                        state.bundle_index = state.bundle.len();
                        match result {
                            Ok(reco) => state.apply_recommendation(reco),
                            Err(message) => state.error = Some(message),
                        }
                    }
                }
            }
            OutcomeKind::AnswerFailed(message) => {
                state.busy = false;
                state.error = Some(message);
            }
            OutcomeKind::RecommendationLoaded(result) => {
                state.busy = false;
                match result {
                    Ok(reco) => state.apply_recommendation(reco),
                    Err(message) => state.error = Some(message),
                }
            }
            OutcomeKind::HistoryRefreshed(history) => {
                if let Some(history) = history {
                    state.history = history;
                }
            }
        }

        if touches_store {
            self.ctx.auth.sync(&state.session);
        }
    }

    /// Prepare, run and apply an action inline
    pub async fn dispatch(&mut self, action: Action) {
        if let Some(job) = self.prepare(action) {
            let outcome = job.run(&self.ctx).await;
            self.apply(outcome);
        }
    }
}
