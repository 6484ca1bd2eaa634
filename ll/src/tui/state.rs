//! TUI application state
//!
//! UI-only data: form fields, answer buffer, overlays. Learner data lives in
//! the flow state and is read by the views, never copied here.

use tracing::debug;

use crate::api::{LoginPayload, RegisterPayload};
use crate::flow::Action;

/// Which authentication form is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn toggle(self) -> Self {
        match self {
            Self::Login => Self::Register,
            Self::Register => Self::Login,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Login => "Log in",
            Self::Register => "Create an account",
        }
    }

    /// Fields shown for this mode, in focus order
    pub fn fields(self) -> &'static [AuthField] {
        match self {
            Self::Login => &[AuthField::UserId, AuthField::Password],
            Self::Register => &[AuthField::UserId, AuthField::Name, AuthField::Password, AuthField::Level],
        }
    }
}

/// Authentication form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    #[default]
    UserId,
    Name,
    Password,
    Level,
}

impl AuthField {
    pub fn label(self) -> &'static str {
        match self {
            Self::UserId => "User id",
            Self::Name => "Name",
            Self::Password => "Password",
            Self::Level => "Level (optional)",
        }
    }
}

/// Contents of the authentication form
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub focus: AuthField,
    pub user_id: String,
    pub name: String,
    pub password: String,
    pub level: String,
}

impl AuthForm {
    pub fn value(&self, field: AuthField) -> &str {
        match field {
            AuthField::UserId => &self.user_id,
            AuthField::Name => &self.name,
            AuthField::Password => &self.password,
            AuthField::Level => &self.level,
        }
    }

    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            AuthField::UserId => &mut self.user_id,
            AuthField::Name => &mut self.name,
            AuthField::Password => &mut self.password,
            AuthField::Level => &mut self.level,
        }
    }

    /// Move focus forward or backward through the visible fields
    pub fn cycle_focus(&mut self, forward: bool) {
        let fields = self.mode.fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
        if !self.mode.fields().contains(&self.focus) {
            self.focus = AuthField::UserId;
        }
        debug!(mode = ?self.mode, "AuthForm::toggle_mode: called");
    }

    /// Build the submit action, or a validation message
    pub fn submit(&self) -> Result<Action, &'static str> {
        let user_id = self.user_id.trim();
        if user_id.is_empty() || self.password.is_empty() {
            return Err("User id and password are required");
        }
        match self.mode {
            AuthMode::Login => Ok(Action::Login(LoginPayload {
                user_id: user_id.to_string(),
                password: self.password.clone(),
            })),
            AuthMode::Register => {
                let name = self.name.trim();
                if name.is_empty() {
                    return Err("Name is required");
                }
                let level = self.level.trim();
                Ok(Action::Register(RegisterPayload {
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                    password: self.password.clone(),
                    level: (!level.is_empty()).then(|| level.to_string()),
                }))
            }
        }
    }
}

/// Main application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub form: AuthForm,
    /// Validation message for the form
    pub form_error: Option<String>,
    /// Free-text answer being typed
    pub answer: String,
    /// Highlighted option of a multiple-choice exercise
    pub selected_option: usize,
    /// Exercise the answer buffer belongs to
    pub exercise_id: Option<String>,
    /// Whether a learner was logged in at the last sync
    pub had_user: bool,
    pub show_help: bool,
    pub should_quit: bool,
    /// Action waiting to be handed to the flow
    pub pending_action: Option<Action>,
    /// Number of recent interactions shown
    pub history_limit: usize,
}

impl AppState {
    pub fn new(history_limit: usize) -> Self {
        debug!(history_limit, "AppState::new: called");
        Self {
            history_limit,
            ..Self::default()
        }
    }

    /// Reset the answer input for a new exercise
    pub fn reset_answer(&mut self, exercise_id: Option<String>) {
        debug!(?exercise_id, "AppState::reset_answer: called");
        self.answer.clear();
        self.selected_option = 0;
        self.exercise_id = exercise_id;
    }
}
