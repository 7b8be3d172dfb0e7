use crate::{
    COMMAND_TARGET, CONSOLE_TARGET, Context, Data, ERROR_TARGET, Error, MODERATION_TARGET,
};
use dashmap::DashMap;
use poise::FrameworkError;
use std::path::Path;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{Level, error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Targets,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Command log file name
pub const COMMAND_LOG_FILE: &str = "commands";
/// Moderation audit log file name
pub const MODERATION_LOG_FILE: &str = "moderation";

/// Default filter when `RUST_LOG` is unset; serenity's heartbeat chatter is muted
pub const DEFAULT_FILTER: &str = "info,serenity=error";

/// Initialize the logging system with console and file outputs
pub fn init(log_dir: &Path) -> Result<(), Error> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let command_file = RollingFileAppender::new(Rotation::DAILY, log_dir, COMMAND_LOG_FILE);
    let moderation_file = RollingFileAppender::new(Rotation::DAILY, log_dir, MODERATION_LOG_FILE);

    // Human-readable console output
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(true);

    let command_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(command_file);

    // Punishments, exemptions and review decisions only
    let moderation_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(moderation_file)
        .with_filter(moderation_filter());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(command_layer)
        .with(moderation_layer)
        .try_init()?;

    info!(log_dir = %log_dir.display(), "Logging system initialized");
    Ok(())
}

fn moderation_filter() -> Targets {
    Targets::new().with_target(MODERATION_TARGET, Level::INFO)
}

/// Start times of in-flight commands, keyed by invocation id
static COMMAND_STARTS: LazyLock<DashMap<u64, Instant>> = LazyLock::new(DashMap::new);

fn record_start(invocation_id: u64) {
    COMMAND_STARTS.insert(invocation_id, Instant::now());
}

fn take_elapsed(invocation_id: u64) -> Option<Duration> {
    COMMAND_STARTS
        .remove(&invocation_id)
        .map(|(_, start)| start.elapsed())
}

fn guild_label(ctx: Context<'_>) -> String {
    ctx.guild_id()
        .map_or_else(|| "DM".to_string(), |id| id.get().to_string())
}

/// Log the start of a command execution (pre-command hook)
pub fn log_command_start(ctx: Context<'_>) {
    record_start(ctx.id());

    let args = if ctx.command().parameters.is_empty() {
        String::new()
    } else {
        format!("{:?}", ctx.invocation_string())
    };

    info!(
        target: COMMAND_TARGET,
        command = %ctx.command().qualified_name,
        guild_id = %guild_label(ctx),
        user_id = %ctx.author().id,
        arguments = %args,
        event = "start",
        "Command execution started"
    );
}

/// Log the end of a command execution (post-command hook)
pub fn log_command_end(ctx: Context<'_>) {
    let duration = take_elapsed(ctx.id());
    let duration_ms = u64::try_from(duration.map_or(0, |d| d.as_millis())).unwrap_or_default();

    info!(
        target: COMMAND_TARGET,
        command = %ctx.command().qualified_name,
        guild_id = %guild_label(ctx),
        user_id = %ctx.author().id,
        duration_ms = duration_ms,
        event = "end",
        "Command execution completed"
    );
}

/// Log errors that occur during command execution
pub fn log_command_error(error: &FrameworkError<'_, Data, Error>) {
    // post_command does not run for failed invocations
    if let Some(ctx) = error.ctx() {
        take_elapsed(ctx.id());
    }

    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = %ctx.author().id,
                error = %error,
                "Command error"
            );
        }
        FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            let error_msg = error
                .as_ref()
                .map_or_else(|| "Check failed".to_string(), ToString::to_string);

            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = %ctx.author().id,
                error = %error_msg,
                "Command check failed"
            );
        }
        FrameworkError::MissingUserPermissions { ctx, missing_permissions, .. } => {
            error!(
                target: ERROR_TARGET,
                command = %ctx.command().qualified_name,
                guild_id = %guild_label(*ctx),
                user_id = %ctx.author().id,
                missing = ?missing_permissions,
                "Command rejected for missing permissions"
            );
        }
        err => {
            error!(
                target: ERROR_TARGET,
                error = ?err,
                "Other framework error"
            );
        }
    }
}

pub fn log_console(message: &str) {
    info!(
        target: CONSOLE_TARGET,
        message = %message,
        event = "console",
    );
}
