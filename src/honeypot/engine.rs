//! Punishment engine
//!
//! Executes the configured branch for a trigger event. Each branch is a short
//! sequence of independent moderation calls with no local transaction; a
//! failure ends the branch where it stands and is reported, never retried.
//! Every branch returns exactly one report, which `punish` logs.

use crate::data::{GuildConfig, PunishmentAction};
use crate::honeypot::{HoneypotError, Pipeline, Report, ReviewControl, TriggerEvent};
use poise::serenity_prelude::{Mentionable, RoleId};
use tracing::{info, warn};

/// Audit log reason attached to honeypot punishments
pub const PUNISHMENT_REASON: &str = "Triggered honeypot channel";

/// Days of message history removed with a ban
pub const BAN_DELETE_MESSAGE_DAYS: u8 = 1;

const NO_PUNISH_ROLE: &str = "no punish role configured";

/// Result of a punishment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Banned,
    Kicked { review: ReviewControl },
    RoleApplied { review: ReviewControl },
    Failed(String),
    Skipped(String),
}

impl Pipeline<'_> {
    /// Punish the author of `event` according to `config.action`, logging the
    /// outcome exactly once.
    pub async fn punish(&self, config: &GuildConfig, event: &TriggerEvent) -> Outcome {
        let (outcome, report) = match config.action {
            PunishmentAction::Ban => self.ban_branch(event).await,
            PunishmentAction::Kick => self.kick_branch(event).await,
            PunishmentAction::Role => self.role_branch(config, event).await,
        };

        match &outcome {
            Outcome::Failed(reason) | Outcome::Skipped(reason) => warn!(
                target: crate::MODERATION_TARGET,
                guild_id = %event.guild_id(),
                user_id = %event.author().id,
                action = %config.action,
                reason = %reason,
                event = "punishment_incomplete",
                "Honeypot punishment did not complete"
            ),
            _ => info!(
                target: crate::MODERATION_TARGET,
                guild_id = %event.guild_id(),
                user_id = %event.author().id,
                action = %config.action,
                event = "punished",
                "Honeypot punishment applied"
            ),
        }

        self.emit(config, report).await;
        outcome
    }

    async fn ban_branch(&self, event: &TriggerEvent) -> (Outcome, Report) {
        let who = event.describe();
        let result = self
            .moderation
            .ban(
                event.guild_id(),
                event.author().id,
                PUNISHMENT_REASON,
                BAN_DELETE_MESSAGE_DAYS,
            )
            .await;

        match result {
            Ok(()) => (
                Outcome::Banned,
                Report::about(
                    event.log_target(),
                    format!(
                        "{who} was banned for tripping the honeypot in {}.",
                        event.channel_id().mention()
                    ),
                ),
            ),
            Err(e) => failure(event, format!("Failed to ban {who}"), &e, "Ban Members"),
        }
    }

    async fn kick_branch(&self, event: &TriggerEvent) -> (Outcome, Report) {
        let who = event.describe();
        let Some(member) = self
            .directory
            .resolve_member(event.guild_id(), event.author().id)
            .await
        else {
            return absent(event);
        };

        if let Err(e) = self
            .moderation
            .kick(event.guild_id(), member.user_id, PUNISHMENT_REASON)
            .await
        {
            return failure(event, format!("Failed to kick {who}"), &e, "Kick Members");
        }

        let review = self
            .reviews
            .open(event.guild_id(), member.user_id, &member.display_name);
        (
            Outcome::Kicked {
                review: review.clone(),
            },
            Report::about(
                event.log_target(),
                format!(
                    "{who} was kicked for tripping the honeypot in {}. Review and ban if necessary.",
                    event.channel_id().mention()
                ),
            )
            .with_control(Some(review)),
        )
    }

    async fn role_branch(&self, config: &GuildConfig, event: &TriggerEvent) -> (Outcome, Report) {
        let who = event.describe();
        let guild_id = event.guild_id();
        let Some(member) = self
            .directory
            .resolve_member(guild_id, event.author().id)
            .await
        else {
            return absent(event);
        };

        let Some(punish_role) = config.punish_role else {
            return not_configured(event);
        };
        match self.directory.role_exists(guild_id, punish_role).await {
            Ok(true) => {}
            Ok(false) => return not_configured(event),
            Err(e) => {
                return failure(
                    event,
                    format!("Failed to look up the punish role for {who}"),
                    &e,
                    "Manage Roles",
                );
            }
        }

        if config.strip_other_roles {
            let preserved = config.preserved_roles();
            let everyone = RoleId::new(guild_id.get());
            let strip: Vec<RoleId> = member
                .roles
                .iter()
                .copied()
                .filter(|role| *role != everyone && !preserved.contains(role))
                .collect();

            if !strip.is_empty() {
                if let Err(e) = self
                    .moderation
                    .revoke_roles(guild_id, member.user_id, &strip, PUNISHMENT_REASON)
                    .await
                {
                    return failure(
                        event,
                        format!("Failed to remove roles from {who}"),
                        &e,
                        "Manage Roles",
                    );
                }
            }
        }

        if !member.roles.contains(&punish_role) {
            if let Err(e) = self
                .moderation
                .grant_role(guild_id, member.user_id, punish_role, PUNISHMENT_REASON)
                .await
            {
                return failure(
                    event,
                    format!("Failed to assign the {} role to {who}", punish_role.mention()),
                    &e,
                    "Manage Roles",
                );
            }
        }

        let review = self
            .reviews
            .open(guild_id, member.user_id, &member.display_name);
        (
            Outcome::RoleApplied {
                review: review.clone(),
            },
            Report::about(
                event.log_target(),
                format!(
                    "{who} was assigned the {} role for tripping the honeypot in {}. Review and ban if necessary.",
                    punish_role.mention(),
                    event.channel_id().mention()
                ),
            )
            .with_control(Some(review)),
        )
    }
}

fn failure(
    event: &TriggerEvent,
    summary: String,
    error: &HoneypotError,
    permission: &str,
) -> (Outcome, Report) {
    let description = format!("{summary}: {error}. {}", error.remediation(permission));
    (
        Outcome::Failed(error.to_string()),
        Report::about(event.log_target(), description),
    )
}

fn absent(event: &TriggerEvent) -> (Outcome, Report) {
    (
        Outcome::Skipped("member no longer in the server".to_string()),
        Report::about(
            event.log_target(),
            format!(
                "{} tripped the honeypot in {} but is no longer in the server.",
                event.describe(),
                event.channel_id().mention()
            ),
        ),
    )
}

fn not_configured(event: &TriggerEvent) -> (Outcome, Report) {
    let error = HoneypotError::NotConfigured(NO_PUNISH_ROLE.to_string());
    (
        Outcome::Failed(NO_PUNISH_ROLE.to_string()),
        Report::about(
            event.log_target(),
            format!(
                "{} tripped the honeypot in {}, but there is {NO_PUNISH_ROLE}. {}",
                event.describe(),
                event.channel_id().mention(),
                error.remediation("Manage Roles")
            ),
        ),
    )
}
