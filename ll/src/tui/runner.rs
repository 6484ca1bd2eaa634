//! TUI Runner - main loop that owns the terminal and the flow
//!
//! The TuiRunner is responsible for:
//! - Dispatching key events to App
//! - Handing the resulting actions to the flow and spawning their jobs
//! - Applying job outcomes as they arrive
//! - Redrawing on every event

use std::time::Duration;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::views;
use crate::flow::{Action, Flow, Outcome};

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner {
    app: App,
    terminal: Tui,
    flow: Flow,
    event_handler: EventHandler,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl TuiRunner {
    pub fn new(terminal: Tui, flow: Flow, tick_rate: Duration, history_limit: usize) -> Self {
        debug!("TuiRunner::new: called");
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            app: App::new(history_limit),
            terminal,
            flow,
            event_handler: EventHandler::new(tick_rate),
            outcome_tx,
            outcome_rx,
        }
    }

    /// Run the TUI main loop
    pub async fn run(&mut self) -> Result<()> {
        debug!("TuiRunner::run: called");
        self.start(Action::RestoreSession);

        loop {
            self.app.sync(self.flow.state());
            let (app, flow) = (self.app.state(), self.flow.state());
            self.terminal.draw(|frame| views::render(app, flow, frame))?;

            tokio::select! {
                event = self.event_handler.next() => {
                    match event? {
                        Event::Key(key) => {
                            if self.app.handle_key(key, self.flow.state()) {
                                break;
                            }
                            if let Some(action) = self.app.take_action() {
                                self.flow.clear_errors();
                                self.start(action);
                            }
                        }
                        Event::Resize(width, height) => debug!(width, height, "TuiRunner::run: resized"),
                        Event::Tick => {}
                    }
                }
                Some(outcome) = self.outcome_rx.recv() => {
                    self.flow.apply(outcome);
                }
            }

            if self.app.state().should_quit {
                debug!("TuiRunner::run: should_quit is true, breaking");
                break;
            }
        }

        info!("Dashboard closed");
        Ok(())
    }

    /// Prepare an action and run its job in the background
    fn start(&mut self, action: Action) {
        debug!(action = action.name(), "TuiRunner::start: called");
        let Some(job) = self.flow.prepare(action) else {
            return;
        };

        let ctx = self.flow.context().clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = job.run(&ctx).await;
            if tx.send(outcome).is_err() {
                debug!("TuiRunner: outcome channel closed");
            }
        });
    }
}
