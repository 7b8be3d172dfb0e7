//! Trigger handler: turns a posted message into an exemption check and, when
//! the author is not exempt, a punishment.

use crate::honeypot::{LogTarget, Outcome, Pipeline, Report, is_exempt};
use poise::serenity_prelude::{ChannelId, GuildId, Mentionable, MessageId, UserId};
use tracing::{debug, info};

/// Author of a posted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Bots, system users and webhooks
    pub automated: bool,
}

/// Inbound "message posted" event as delivered by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author: Author,
}

/// Snapshot of a trap channel hit, taken once and never modified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    guild_id: GuildId,
    channel_id: ChannelId,
    message_id: MessageId,
    author: Author,
}

impl TriggerEvent {
    #[must_use]
    pub fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
        author: Author,
    ) -> Self {
        Self {
            guild_id,
            channel_id,
            message_id,
            author,
        }
    }

    #[must_use]
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    #[must_use]
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Mention plus name, so the entry stays readable after the member is gone
    pub(crate) fn describe(&self) -> String {
        format!("{} ({})", self.author.id.mention(), self.author.name)
    }

    pub(crate) fn log_target(&self) -> LogTarget {
        LogTarget {
            user_id: self.author.id,
            name: self.author.name.clone(),
            avatar_url: self.author.avatar_url.clone(),
        }
    }
}

/// What the trigger handler did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Not a trap channel hit, nothing happened
    Ignored,
    /// The author is exempt; only a log entry was written
    Exempt,
    Punished(Outcome),
}

impl Pipeline<'_> {
    /// Handle one posted message.
    pub async fn handle_message(&self, message: PostedMessage) -> TriggerOutcome {
        if message.author.automated {
            return TriggerOutcome::Ignored;
        }
        let Some(guild_id) = message.guild_id else {
            return TriggerOutcome::Ignored;
        };

        let config = self.config.get(guild_id).await;
        if config.trap_channel != Some(message.channel_id) {
            return TriggerOutcome::Ignored;
        }

        let event = TriggerEvent::new(
            guild_id,
            message.channel_id,
            message.message_id,
            message.author,
        );

        if is_exempt(&config, self.directory, event.author().id).await {
            info!(
                target: crate::MODERATION_TARGET,
                guild_id = %guild_id,
                user_id = %event.author().id,
                event = "exempt",
                "Exempt member posted in the honeypot"
            );
            let description = format!(
                "{} was exempt from the honeypot in {}.",
                event.describe(),
                event.channel_id().mention()
            );
            self.emit(&config, Report::about(event.log_target(), description))
                .await;
            return TriggerOutcome::Exempt;
        }

        if let Err(e) = self
            .moderation
            .delete_message(event.channel_id(), event.message_id())
            .await
        {
            debug!(
                guild_id = %guild_id,
                message_id = %event.message_id(),
                "Could not delete honeypot message: {e}"
            );
        }

        TriggerOutcome::Punished(self.punish(&config, &event).await)
    }
}
