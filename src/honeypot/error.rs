//! Error types for the honeypot pipeline
//!
//! Every failure a moderation call can produce is recovered locally and turned
//! into a log line, so these errors mostly travel as values rather than panics.

use poise::serenity_prelude as serenity;
use ::serenity::http::HttpError;
use ::serenity::model::ModelError;
use thiserror::Error;

/// Discord JSON error codes we classify
const MISSING_PERMISSIONS: isize = 50013;
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_MEMBER: isize = 10007;
const UNKNOWN_ROLE: isize = 10011;
const UNKNOWN_USER: isize = 10013;

/// Errors that can occur while evaluating or executing a honeypot punishment
#[derive(Debug, Error)]
pub enum HoneypotError {
    /// The bot lacks a permission the call needs
    #[error("Missing permissions: {0}")]
    PermissionDenied(String),

    /// The target sits above the bot in the role hierarchy
    #[error("Role hierarchy prevents this action")]
    HierarchyViolation,

    /// The member or user is gone
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// The channel is missing or not usable
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// A required setting (the punish role) is missing or stale
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The guild could not be reached
    #[error("Guild unavailable: {0}")]
    GuildUnavailable(String),

    /// Invalid review state transition attempted
    #[error("Invalid state transition")]
    InvalidStateTransition,

    /// Review token not found
    #[error("Review not found: {0}")]
    ReviewNotFound(String),

    /// Discord API error that does not fit the taxonomy
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<serenity::Error>),

    /// Reading or writing the settings file failed
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<serenity::Error> for HoneypotError {
    fn from(error: serenity::Error) -> Self {
        match &error {
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
                let message = response.error.message.clone();
                match response.error.code {
                    MISSING_PERMISSIONS => Self::PermissionDenied(message),
                    UNKNOWN_MEMBER | UNKNOWN_USER => Self::TargetNotFound(message),
                    UNKNOWN_CHANNEL => Self::ChannelUnavailable(message),
                    UNKNOWN_ROLE => Self::NotConfigured(message),
                    _ => Self::DiscordApi(Box::new(error)),
                }
            }
            serenity::Error::Model(ModelError::Hierarchy) => Self::HierarchyViolation,
            serenity::Error::Model(ModelError::InvalidPermissions { required, .. }) => {
                Self::PermissionDenied(format!("requires {required:?}"))
            }
            _ => Self::DiscordApi(Box::new(error)),
        }
    }
}

impl From<serde_yaml::Error> for HoneypotError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Persistence(error.to_string())
    }
}

impl From<std::io::Error> for HoneypotError {
    fn from(error: std::io::Error) -> Self {
        Self::Persistence(error.to_string())
    }
}

impl HoneypotError {
    /// A short hint telling moderators how to fix the failure.
    ///
    /// `permission` names the Discord permission the failed call needed.
    #[must_use]
    pub fn remediation(&self, permission: &str) -> String {
        match self {
            Self::PermissionDenied(_) | Self::HierarchyViolation => format!(
                "Check that I have the {permission} permission and that my highest role is above theirs."
            ),
            Self::TargetNotFound(_) => "They may have already left the server.".to_string(),
            Self::ChannelUnavailable(_) => {
                "Check that the channel still exists and that I can see it.".to_string()
            }
            Self::NotConfigured(_) => {
                "Set a punish role with `honeypot role` before using the role action.".to_string()
            }
            Self::GuildUnavailable(_) => {
                "The server is unavailable right now, try again later.".to_string()
            }
            _ => format!("Check my {permission} permission and role position, then try again."),
        }
    }
}

/// Result type for honeypot operations
pub type HoneypotResult<T> = Result<T, HoneypotError>;
