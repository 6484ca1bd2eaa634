//! Session and exercise-flow state
//!
//! Pure data plus the transitions applied when a job completes. No I/O here:
//! requests are described by [`Job`](super::Job) and their results come back
//! as [`Outcome`](super::Outcome).

use tracing::{debug, info, warn};

use crate::api::{Exercise, Interaction, Recommendation, UserProfile};
use crate::progress::{SkillProgress, aggregate};
use crate::session::Session;

pub const MSG_SESSION_EXPIRED: &str = "Session expired, please log in again.";
pub const MSG_LOGIN_FAILED: &str = "Unable to log in";
pub const MSG_REGISTER_FAILED: &str = "Unable to register";
pub const MSG_BUNDLE_FAILED: &str = "Unable to load the initial exercises";
pub const MSG_ANSWER_FAILED: &str = "Error while saving the answer";
pub const MSG_NO_RECOMMENDATION: &str = "No recommendation available";
pub const MSG_LOGIN_REQUIRED: &str = "Please log in";

/// Default congratulation when the service reports mastery
pub fn mastery_text(skill_id: &str) -> String {
    format!("Skill {} mastered, well done!", skill_id)
}

/// Where the learner is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Session not yet checked, or an auth request is in flight
    Loading,
    /// No learner logged in
    Unauthenticated,
    /// Working through the calibration bundle
    Calibration { index: usize, total: usize },
    /// Adaptive recommendations
    Recommendation,
}

/// Everything the views need to render, owned by the orchestration layer
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    pub session: Session,
    pub user: Option<UserProfile>,
    /// Startup session check finished
    pub token_checked: bool,
    /// Login/register/restore in flight
    pub auth_busy: bool,
    /// Exercise/recommendation request in flight
    pub busy: bool,
    pub auth_error: Option<String>,
    pub error: Option<String>,
    pub bundle: Vec<Exercise>,
    pub bundle_index: usize,
    pub recommendation: Option<Recommendation>,
    pub recommended_exercise: Option<Exercise>,
    pub mastery_message: Option<String>,
    pub history: Vec<Interaction>,
    /// Bumped on login and logout; outcomes from older epochs are dropped
    pub epoch: u64,
}

impl FlowState {
    pub fn new() -> Self {
        debug!("FlowState::new: called");
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if !self.token_checked || self.auth_busy {
            Phase::Loading
        } else if self.user.is_none() {
            Phase::Unauthenticated
        } else if self.bundle_index < self.bundle.len() {
            Phase::Calibration {
                index: self.bundle_index,
                total: self.bundle.len(),
            }
        } else {
            Phase::Recommendation
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }

    /// Bundle item while calibrating, the recommended exercise afterwards
    pub fn current_exercise(&self) -> Option<&Exercise> {
        if self.bundle_index < self.bundle.len() {
            self.bundle.get(self.bundle_index)
        } else {
            self.recommended_exercise.as_ref()
        }
    }

    /// The calibration bundle has been worked through
    pub fn finished_calibration(&self) -> bool {
        !self.bundle.is_empty() && self.bundle_index >= self.bundle.len()
    }

    /// Per-skill progress, recomputed from the full history
    pub fn progress(&self) -> Vec<SkillProgress> {
        aggregate(&self.history)
    }

    /// Most recent interactions, newest first
    pub fn recent_history(&self, limit: usize) -> impl Iterator<Item = &Interaction> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).rev()
    }

    /// Forget everything tied to the current learner
    pub(crate) fn clear_learner(&mut self) {
        debug!("FlowState::clear_learner: called");
        self.user = None;
        self.bundle.clear();
        self.bundle_index = 0;
        self.recommendation = None;
        self.recommended_exercise = None;
        self.history.clear();
        self.mastery_message = None;
    }

    /// Reset to a logged-out state and start a new epoch
    pub(crate) fn logout(&mut self) {
        info!("Logging out {:?}", self.user_id());
        self.clear_learner();
        self.session = Session::anonymous();
        self.auth_error = None;
        self.error = None;
        self.busy = false;
        self.auth_busy = false;
        self.token_checked = true;
        self.epoch += 1;
    }

    pub(crate) fn start_session(
        &mut self,
        session: Session,
        user: UserProfile,
        bundle: Result<Vec<Exercise>, String>,
        history: Option<Vec<Interaction>>,
    ) {
        info!("Session started for {}", user.user_id);
        self.clear_learner();
        self.epoch += 1;
        self.session = session;
        self.user = Some(user);
        self.token_checked = true;
        self.auth_busy = false;
        self.auth_error = None;
        self.error = None;
        self.apply_bundle(bundle);
        if let Some(history) = history {
            self.history = history;
        }
    }

    pub(crate) fn auth_failed(&mut self, message: String) {
        warn!("Authentication failed: {}", message);
        self.session = Session::anonymous();
        self.user = None;
        self.token_checked = true;
        self.auth_busy = false;
        self.auth_error = Some(message);
    }

    pub(crate) fn apply_bundle(&mut self, bundle: Result<Vec<Exercise>, String>) {
        match bundle {
            Ok(exercises) => {
                debug!(count = exercises.len(), "FlowState::apply_bundle: loaded");
                self.bundle = exercises;
                self.bundle_index = 0;
                self.recommendation = None;
                self.recommended_exercise = None;
            }
            Err(message) => {
                debug!(%message, "FlowState::apply_bundle: failed");
                self.error = Some(message);
            }
        }
    }

    /// Install a recommendation and derive the next exercise or mastery message
    pub(crate) fn apply_recommendation(&mut self, reco: Recommendation) {
        debug!(exercise_id = %reco.exercise_id, mastery = reco.mastery, "FlowState::apply_recommendation: called");
        if reco.is_terminal_mastery() {
            self.recommended_exercise = None;
            self.mastery_message = Some(if reco.prompt.is_empty() {
                mastery_text(&reco.skill_id)
            } else {
                reco.prompt.clone()
            });
        } else {
            self.recommended_exercise = Some(reco.to_exercise());
            self.mastery_message = reco.mastery.then(|| mastery_text(&reco.skill_id));
        }
        self.recommendation = Some(reco);
    }
}
