//! Terminal dashboard
//!
//! Split the usual way: `app` handles keys, `state` holds UI-only data,
//! `views` renders, `events` feeds terminal input and `runner` ties them to
//! the flow.

pub mod app;
pub mod events;
pub mod runner;
pub mod state;
pub mod views;

use std::time::Duration;

use eyre::Result;
use tracing::info;

use crate::config::TuiConfig;
use crate::flow::Flow;
use runner::TuiRunner;

/// Terminal type used by the dashboard
pub type Tui = ratatui::DefaultTerminal;

/// Run the dashboard until the learner quits
///
/// The terminal is restored on every exit path, including errors.
pub async fn run(flow: Flow, config: &TuiConfig) -> Result<()> {
    info!("Starting dashboard");
    let terminal = ratatui::try_init()?;
    let mut runner = TuiRunner::new(
        terminal,
        flow,
        Duration::from_millis(config.tick_rate_ms),
        config.history_limit,
    );
    let result = runner.run().await;
    ratatui::restore();
    result
}
