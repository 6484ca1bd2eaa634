//! TUI application - key handling
//!
//! The App owns the UI-only [`AppState`] and turns key presses into flow
//! actions. It never performs I/O: actions are left in `pending_action` for
//! the runner, and rendering is delegated to the views module.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, trace};

use super::state::AppState;
use crate::flow::{Action, FlowState, Phase};

/// TUI application
#[derive(Debug)]
pub struct App {
    state: AppState,
}

impl App {
    pub fn new(history_limit: usize) -> Self {
        debug!("App::new: called");
        Self {
            state: AppState::new(history_limit),
        }
    }

    pub fn state(&self) -> &AppState {
        trace!("App::state: called");
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        trace!("App::state_mut: called");
        &mut self.state
    }

    /// Take the action produced by the last key press
    pub fn take_action(&mut self) -> Option<Action> {
        self.state.pending_action.take()
    }

    /// Align UI state with the flow after an outcome was applied
    pub fn sync(&mut self, flow: &FlowState) {
        let exercise_id = flow.current_exercise().map(|e| e.id.clone());
        if exercise_id != self.state.exercise_id {
            self.state.reset_answer(exercise_id);
        }

        let has_user = flow.user.is_some();
        if has_user && !self.state.had_user {
            debug!("App::sync: logged in, clearing password");
            self.state.form.password.clear();
            self.state.form_error = None;
        }
        self.state.had_user = has_user;
    }

    /// Handle a key event
    ///
    /// Returns true if the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent, flow: &FlowState) -> bool {
        debug!(?key, "App::handle_key: called");
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                debug!("App::handle_key: Ctrl+C quit");
                self.state.should_quit = true;
                return true;
            }
            (KeyCode::Esc, _) => {
                if self.state.show_help {
                    self.state.show_help = false;
                } else {
                    debug!("App::handle_key: Esc quit");
                    self.state.should_quit = true;
                    return true;
                }
            }
            (KeyCode::F(1), _) => {
                self.state.show_help = !self.state.show_help;
            }
            _ if self.state.show_help => {
                trace!("App::handle_key: help shown, ignoring key");
            }
            (KeyCode::Char('l'), KeyModifiers::CONTROL) => {
                if flow.user.is_some() || flow.auth_busy {
                    debug!("App::handle_key: logout");
                    self.state.pending_action = Some(Action::Logout);
                }
            }
            _ => match flow.phase() {
                Phase::Loading => trace!("App::handle_key: loading, ignoring key"),
                Phase::Unauthenticated => self.handle_auth_key(key),
                Phase::Calibration { .. } | Phase::Recommendation => self.handle_exercise_key(key, flow),
            },
        }
        false
    }

    /// Keys on the login/register form
    fn handle_auth_key(&mut self, key: KeyEvent) {
        debug!(?key, "App::handle_auth_key: called");
        let form = &mut self.state.form;
        match (key.code, key.modifiers) {
            (KeyCode::Char('t'), KeyModifiers::CONTROL) => {
                form.toggle_mode();
                self.state.form_error = None;
            }
            (KeyCode::Tab, _) | (KeyCode::Down, _) => form.cycle_focus(true),
            (KeyCode::BackTab, _) | (KeyCode::Up, _) => form.cycle_focus(false),
            (KeyCode::Enter, _) => match form.submit() {
                Ok(action) => {
                    self.state.form_error = None;
                    self.state.pending_action = Some(action);
                }
                Err(message) => self.state.form_error = Some(message.to_string()),
            },
            (KeyCode::Backspace, _) => {
                form.focused_mut().pop();
            }
            (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => {
                form.focused_mut().push(c);
            }
            _ => trace!("App::handle_auth_key: unhandled"),
        }
    }

    /// Keys on the exercise screen
    fn handle_exercise_key(&mut self, key: KeyEvent, flow: &FlowState) {
        debug!(?key, "App::handle_exercise_key: called");
        let choices = flow.current_exercise().and_then(|e| e.choices());
        let state = &mut self.state;

        match (key.code, key.modifiers) {
            (KeyCode::Char('r'), KeyModifiers::CONTROL) => {
                state.pending_action = Some(Action::RefreshRecommendation);
            }
            (KeyCode::Char('b'), KeyModifiers::CONTROL) => {
                state.pending_action = Some(Action::ReloadBundle);
            }
            (KeyCode::F(5), _) => {
                state.pending_action = Some(Action::RefreshHistory);
            }
            (KeyCode::Up, _) => {
                state.selected_option = state.selected_option.saturating_sub(1);
            }
            (KeyCode::Down, _) => {
                if let Some(options) = choices {
                    state.selected_option = (state.selected_option + 1).min(options.len() - 1);
                }
            }
            (KeyCode::Enter, _) => {
                let answer = match choices {
                    Some(options) => options.get(state.selected_option).cloned(),
                    None => Some(state.answer.clone()),
                };
                if let Some(answer) = answer.filter(|a| !a.trim().is_empty()) {
                    state.pending_action = Some(Action::Answer(answer));
                }
            }
            (KeyCode::Backspace, _) if choices.is_none() => {
                state.answer.pop();
            }
            (KeyCode::Char(c), m) if choices.is_none() && !m.contains(KeyModifiers::CONTROL) => {
                state.answer.push(c);
            }
            _ => trace!("App::handle_exercise_key: unhandled"),
        }
    }
}
