//! Request sequences run on behalf of user actions
//!
//! A [`Job`] is everything a sequence needs, captured from the state when the
//! action was accepted. Running it performs the requests one after another
//! and yields an [`Outcome`] tagged with the epoch it was prepared in.

use tracing::{debug, info, warn};

use super::FlowContext;
use super::state::{
    MSG_ANSWER_FAILED, MSG_BUNDLE_FAILED, MSG_LOGIN_FAILED, MSG_NO_RECOMMENDATION, MSG_REGISTER_FAILED,
    MSG_SESSION_EXPIRED,
};
use crate::api::{
    Exercise, Interaction, InteractionPayload, LoginPayload, Recommendation, RegisterPayload, UserProfile,
};
use crate::session::Session;

/// Something the learner asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Resume the stored session at startup
    RestoreSession,
    Login(LoginPayload),
    Register(RegisterPayload),
    Logout,
    /// Fetch the calibration bundle again
    ReloadBundle,
    /// Answer the current exercise
    Answer(String),
    RefreshRecommendation,
    RefreshHistory,
}

impl Action {
    /// Short name for logging; payloads may carry credentials
    pub fn name(&self) -> &'static str {
        match self {
            Self::RestoreSession => "restore-session",
            Self::Login(_) => "login",
            Self::Register(_) => "register",
            Self::Logout => "logout",
            Self::ReloadBundle => "reload-bundle",
            Self::Answer(_) => "answer",
            Self::RefreshRecommendation => "refresh-recommendation",
            Self::RefreshHistory => "refresh-history",
        }
    }
}

/// A prepared request sequence
#[derive(Debug, Clone)]
pub struct Job {
    pub(crate) epoch: u64,
    pub(crate) kind: JobKind,
}

#[derive(Debug, Clone)]
pub(crate) enum JobKind {
    Restore {
        session: Session,
    },
    Login {
        payload: LoginPayload,
    },
    Register {
        payload: RegisterPayload,
    },
    Logout {
        session: Session,
    },
    Bundle {
        session: Session,
    },
    Answer {
        session: Session,
        user_id: String,
        payload: InteractionPayload,
        fetch_recommendation: bool,
    },
    Recommendation {
        session: Session,
        user_id: String,
    },
    History {
        session: Session,
        user_id: String,
    },
}

/// Result of a job, applied to the state by the orchestration layer
#[derive(Debug, Clone)]
pub struct Outcome {
    pub epoch: u64,
    pub kind: OutcomeKind,
}

/// What happened after an answer was recorded
#[derive(Debug, Clone)]
pub enum AnswerNext {
    /// Move to the next calibration exercise
    Advance,
    /// Calibration done; result of fetching a recommendation
    Recommendation(Result<Recommendation, String>),
}

#[derive(Debug, Clone)]
pub enum OutcomeKind {
    SessionStarted {
        session: Session,
        user: UserProfile,
        bundle: Result<Vec<Exercise>, String>,
        history: Option<Vec<Interaction>>,
    },
    AuthFailed(String),
    LoggedOut(Result<(), String>),
    BundleLoaded(Result<Vec<Exercise>, String>),
    Answered {
        history: Option<Vec<Interaction>>,
        next: AnswerNext,
    },
    AnswerFailed(String),
    RecommendationLoaded(Result<Recommendation, String>),
    HistoryRefreshed(Option<Vec<Interaction>>),
}

impl Job {
    pub(crate) fn new(epoch: u64, kind: JobKind) -> Self {
        Self { epoch, kind }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self.kind {
            JobKind::Restore { .. } => "restore",
            JobKind::Login { .. } => "login",
            JobKind::Register { .. } => "register",
            JobKind::Logout { .. } => "logout",
            JobKind::Bundle { .. } => "bundle",
            JobKind::Answer { .. } => "answer",
            JobKind::Recommendation { .. } => "recommendation",
            JobKind::History { .. } => "history",
        }
    }

    /// Perform the request sequence to completion
    pub async fn run(self, ctx: &FlowContext) -> Outcome {
        debug!(job = self.name(), epoch = self.epoch, "Job::run: called");
        let kind = match self.kind {
            JobKind::Restore { session } => restore(ctx, session).await,
            JobKind::Login { payload } => login(ctx, &payload).await,
            JobKind::Register { payload } => register(ctx, &payload).await,
            JobKind::Logout { session } => {
                let result = ctx.auth.logout(&session).await.map_err(|e| e.to_string());
                OutcomeKind::LoggedOut(result)
            }
            JobKind::Bundle { session } => OutcomeKind::BundleLoaded(load_bundle(ctx, &session).await),
            JobKind::Answer {
                session,
                user_id,
                payload,
                fetch_recommendation,
            } => answer(ctx, &session, &user_id, &payload, fetch_recommendation).await,
            JobKind::Recommendation { session, user_id } => OutcomeKind::RecommendationLoaded(
                ctx.api
                    .next_recommendation(&session, &user_id)
                    .await
                    .map_err(|e| e.user_message(MSG_NO_RECOMMENDATION)),
            ),
            JobKind::History { session, user_id } => {
                OutcomeKind::HistoryRefreshed(fetch_history(ctx, &session, &user_id).await)
            }
        };
        Outcome {
            epoch: self.epoch,
            kind,
        }
    }
}

/// History refresh that never fails the surrounding sequence
async fn fetch_history(ctx: &FlowContext, session: &Session, user_id: &str) -> Option<Vec<Interaction>> {
    match ctx.api.history(session, user_id).await {
        Ok(history) => {
            debug!(count = history.len(), "fetch_history: loaded");
            Some(history)
        }
        Err(e) => {
            warn!("History refresh failed: {}", e);
            None
        }
    }
}

async fn load_bundle(ctx: &FlowContext, session: &Session) -> Result<Vec<Exercise>, String> {
    ctx.api
        .initial_exercises(session)
        .await
        .map_err(|e| e.user_message(MSG_BUNDLE_FAILED))
}

/// Load what a fresh session shows: calibration bundle, then history
async fn start_session(ctx: &FlowContext, session: Session, user: UserProfile) -> OutcomeKind {
    debug!(user_id = %user.user_id, "start_session: called");
    let bundle = load_bundle(ctx, &session).await;
    let history = fetch_history(ctx, &session, &user.user_id).await;
    OutcomeKind::SessionStarted {
        session,
        user,
        bundle,
        history,
    }
}

async fn restore(ctx: &FlowContext, session: Session) -> OutcomeKind {
    match ctx.auth.current_user(&session).await {
        Ok(user) => {
            info!("Restored session for {}", user.user_id);
            start_session(ctx, session, user).await
        }
        Err(e) => {
            warn!("Stored session rejected: {}", e);
            OutcomeKind::AuthFailed(MSG_SESSION_EXPIRED.to_string())
        }
    }
}

async fn login(ctx: &FlowContext, payload: &LoginPayload) -> OutcomeKind {
    let result = async {
        let session = ctx.auth.login(payload).await?;
        let user = ctx.auth.current_user(&session).await?;
        Ok::<_, crate::auth::AuthError>((session, user))
    }
    .await;

    match result {
        Ok((session, user)) => start_session(ctx, session, user).await,
        Err(e) => OutcomeKind::AuthFailed(e.user_message(MSG_LOGIN_FAILED)),
    }
}

async fn register(ctx: &FlowContext, payload: &RegisterPayload) -> OutcomeKind {
    if let Err(e) = ctx.auth.register(payload).await {
        return OutcomeKind::AuthFailed(e.user_message(MSG_REGISTER_FAILED));
    }
    login(ctx, &payload.credentials()).await
}

async fn answer(
    ctx: &FlowContext,
    session: &Session,
    user_id: &str,
    payload: &InteractionPayload,
    fetch_recommendation: bool,
) -> OutcomeKind {
    if let Err(e) = ctx.api.submit_interaction(session, payload).await {
        return OutcomeKind::AnswerFailed(e.user_message(MSG_ANSWER_FAILED));
    }
    info!(
        "Recorded answer to {} ({})",
        payload.exercise_id,
        if payload.correct { "correct" } else { "incorrect" }
    );

    let history = fetch_history(ctx, session, user_id).await;
    let next = if fetch_recommendation {
        AnswerNext::Recommendation(
            ctx.api
                .next_recommendation(session, user_id)
                .await
                .map_err(|e| e.user_message(MSG_NO_RECOMMENDATION)),
        )
    } else {
        AnswerNext::Advance
    };

    OutcomeKind::Answered { history, next }
}
