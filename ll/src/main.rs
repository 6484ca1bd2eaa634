//! learnloop - adaptive learning in the terminal
//!
//! CLI entry point: one-shot commands against the recommendation service, or
//! the interactive dashboard when no command is given.

use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, bail, eyre};
use rustyline::completion::Completer;
use rustyline::config::{ColorMode, Configurer};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};
use tracing::{debug, info, warn};

use learnloop::api::{HttpApi, LearningApi, LoginPayload, RegisterPayload, UserProfile};
use learnloop::auth::AuthError;
use learnloop::cli::{Cli, Command, OutputFormat};
use learnloop::config::Config;
use learnloop::flow::{
    Flow, FlowContext, MSG_LOGIN_FAILED, MSG_LOGIN_REQUIRED, MSG_NO_RECOMMENDATION, MSG_REGISTER_FAILED,
    MSG_SESSION_EXPIRED,
};
use learnloop::progress::aggregate;
use learnloop::report;
use learnloop::session::{FileTokenStore, Session, TokenStore};
use learnloop::tui;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("learnloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("learnloop.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env();
    config.apply_overrides(cli.api_url.as_deref(), None);
    info!("Using service at {}", config.api.base_url);

    let api: Arc<dyn LearningApi> = Arc::new(HttpApi::from_config(&config.api).context("Invalid service URL")?);
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.storage.token_file.clone()));
    let ctx = FlowContext::new(api, store);

    debug!("main: dispatching command");
    match cli.command {
        None => tui::run(Flow::new(ctx), &config.tui).await,
        Some(Command::Register {
            user_id,
            name,
            password,
            level,
        }) => {
            let payload = RegisterPayload {
                user_id,
                name,
                password: resolve_password(password)?,
                level,
            };
            cmd_register(&ctx, payload).await
        }
        Some(Command::Login { user_id, password }) => {
            let payload = LoginPayload {
                user_id,
                password: resolve_password(password)?,
            };
            cmd_login(&ctx, &payload).await
        }
        Some(Command::Logout) => cmd_logout(&ctx).await,
        Some(Command::Whoami) => cmd_whoami(&ctx).await,
        Some(Command::History { limit, format }) => {
            cmd_history(&ctx, limit.unwrap_or(config.tui.history_limit), format).await
        }
        Some(Command::Progress { format }) => cmd_progress(&ctx, format).await,
        Some(Command::Next { format }) => cmd_next(&ctx, format).await,
    }
}

/// Password from the command line or environment, else prompted
fn resolve_password(provided: Option<String>) -> Result<String> {
    match provided {
        Some(password) if !password.is_empty() => Ok(password),
        _ => prompt_password(),
    }
}

/// Hides typed characters while reading a password
struct MaskingHelper;

impl Completer for MaskingHelper {
    type Candidate = String;
}

impl Hinter for MaskingHelper {
    type Hint = String;
}

impl Validator for MaskingHelper {}

impl Helper for MaskingHelper {}

impl Highlighter for MaskingHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned("*".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn prompt_password() -> Result<String> {
    let mut rl: Editor<MaskingHelper, DefaultHistory> =
        Editor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
    rl.set_helper(Some(MaskingHelper));
    rl.set_color_mode(ColorMode::Forced);
    rl.set_auto_add_history(false);

    match rl.readline("Password: ") {
        Ok(line) if !line.is_empty() => Ok(line),
        Ok(_) => bail!("A password is required"),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => bail!("Cancelled"),
        Err(e) => Err(eyre!("Failed to read password: {}", e)),
    }
}

/// Stored session and its learner, or a message telling the user to log in
async fn require_session(ctx: &FlowContext) -> Result<(Session, UserProfile)> {
    let Some(session) = ctx.auth.restore()? else {
        bail!("{}. Run `ll login` first.", MSG_LOGIN_REQUIRED);
    };

    match ctx.auth.current_user(&session).await {
        Ok(user) => Ok((session, user)),
        Err(AuthError::Api(e)) if e.is_unauthorized() => {
            warn!("Stored token rejected: {}", e);
            ctx.auth.forget();
            bail!(MSG_SESSION_EXPIRED)
        }
        Err(e) => Err(e).context("Failed to fetch the current user"),
    }
}

async fn cmd_register(ctx: &FlowContext, payload: RegisterPayload) -> Result<()> {
    debug!(user_id = %payload.user_id, "cmd_register: called");
    let user = ctx
        .auth
        .register(&payload)
        .await
        .map_err(|e| eyre!(e.user_message(MSG_REGISTER_FAILED)))?;
    println!("Registered {} ({})", user.name, user.user_id);
    cmd_login(ctx, &payload.credentials()).await
}

async fn cmd_login(ctx: &FlowContext, payload: &LoginPayload) -> Result<()> {
    debug!(user_id = %payload.user_id, "cmd_login: called");
    let result = async {
        let session = ctx.auth.login(payload).await?;
        Ok::<_, AuthError>(ctx.auth.current_user(&session).await?)
    }
    .await;

    match result {
        Ok(user) => {
            println!("Logged in as {} ({})", user.name, user.user_id);
            Ok(())
        }
        Err(e) => {
            ctx.auth.forget();
            bail!(e.user_message(MSG_LOGIN_FAILED))
        }
    }
}

async fn cmd_logout(ctx: &FlowContext) -> Result<()> {
    debug!("cmd_logout: called");
    let Some(session) = ctx.auth.restore()? else {
        println!("Not logged in");
        return Ok(());
    };

    // The token is forgotten even when the service call fails
    if let Err(e) = ctx.auth.logout(&session).await {
        warn!("Logout request failed: {}", e);
        eprintln!("Warning: the service did not confirm the logout ({})", e);
    }
    println!("Logged out");
    Ok(())
}

async fn cmd_whoami(ctx: &FlowContext) -> Result<()> {
    let (_, user) = require_session(ctx).await?;
    print!("{}", report::profile_text(&user));
    Ok(())
}

async fn cmd_history(ctx: &FlowContext, limit: usize, format: OutputFormat) -> Result<()> {
    debug!(limit, ?format, "cmd_history: called");
    let (session, user) = require_session(ctx).await?;
    let history = ctx
        .api
        .history(&session, &user.user_id)
        .await
        .context("Failed to load history")?;

    match format {
        OutputFormat::Json => println!("{}", report::history_json(&history, limit)?),
        OutputFormat::Text => print!("{}", report::history_text(&history, limit)),
    }
    Ok(())
}

async fn cmd_progress(ctx: &FlowContext, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_progress: called");
    let (session, user) = require_session(ctx).await?;
    let history = ctx
        .api
        .history(&session, &user.user_id)
        .await
        .context("Failed to load history")?;
    let rows = aggregate(&history);

    match format {
        OutputFormat::Json => println!("{}", report::progress_json(&rows)?),
        OutputFormat::Text => print!("{}", report::progress_text(&rows)),
    }
    Ok(())
}

async fn cmd_next(ctx: &FlowContext, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_next: called");
    let (session, user) = require_session(ctx).await?;
    let reco = ctx
        .api
        .next_recommendation(&session, &user.user_id)
        .await
        .map_err(|e| eyre!(e.user_message(MSG_NO_RECOMMENDATION)))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reco)?),
        OutputFormat::Text => print!("{}", report::recommendation_text(&reco)),
    }
    Ok(())
}
