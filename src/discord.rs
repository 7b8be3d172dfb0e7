//! Serenity-backed capabilities
//!
//! [`DiscordGateway`] wraps the event's `Context` and implements the
//! directory, moderation and notifier traits the honeypot pipeline runs on.

use crate::honeypot::{
    Actor, Directory, GuildMember, HoneypotError, HoneypotResult, InteractionRef, LogEntry,
    MessageRef, Moderation, Notifier, ReviewControl,
};
use async_trait::async_trait;
use poise::serenity_prelude::{
    ButtonStyle, ChannelId, ChannelType, Colour, Context, CreateActionRow,
    CreateButton, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EditMessage,
    GuildId, MessageId, Permissions, RoleId, Timestamp, UserId,
};
use tracing::{debug, info};

/// Label of the review button
pub const REVIEW_BUTTON_LABEL: &str = "Ban User";

/// Author shown on entries that are not about a specific user
pub const ALERT_AUTHOR: &str = "Honeypot Alert";

/// Capabilities backed by a live gateway connection
#[derive(Clone)]
pub struct DiscordGateway {
    ctx: Context,
}

impl DiscordGateway {
    #[must_use]
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    fn guild_name(&self, guild_id: GuildId) -> String {
        guild_id
            .name(&self.ctx.cache)
            .unwrap_or_else(|| guild_id.to_string())
    }

    fn bot_avatar(&self) -> String {
        self.ctx.cache.current_user().face()
    }

    /// Render an audit entry the way every log channel sees it
    fn render(&self, entry: &LogEntry) -> CreateMessage {
        let author = match &entry.target {
            Some(target) => {
                let author = CreateEmbedAuthor::new(&target.name);
                match &target.avatar_url {
                    Some(url) => author.icon_url(url),
                    None => author,
                }
            }
            None => CreateEmbedAuthor::new(ALERT_AUTHOR).icon_url(self.bot_avatar()),
        };

        let embed = CreateEmbed::new()
            .author(author)
            .description(&entry.description)
            .colour(Colour::RED)
            .timestamp(Timestamp::now())
            .footer(CreateEmbedFooter::new(format!(
                "Guild: {}",
                self.guild_name(entry.guild_id)
            )));

        let message = CreateMessage::new().embed(embed);
        match &entry.control {
            Some(control) => message.components(vec![CreateActionRow::Buttons(vec![
                review_button(control),
            ])]),
            None => message,
        }
    }

    /// Resolve a log channel, insisting on a plain text channel
    async fn text_channel(&self, channel_id: ChannelId) -> HoneypotResult<()> {
        let channel = channel_id.to_channel(&self.ctx).await?.guild().ok_or_else(|| {
            HoneypotError::ChannelUnavailable(format!("{channel_id} is not a guild channel"))
        })?;

        if channel.kind != ChannelType::Text {
            return Err(HoneypotError::ChannelUnavailable(format!(
                "{channel_id} is not a text channel"
            )));
        }
        Ok(())
    }
}

/// The "Ban User" button bound to `control`
#[must_use]
pub fn review_button(control: &ReviewControl) -> CreateButton {
    CreateButton::new(control.custom_id())
        .label(REVIEW_BUTTON_LABEL)
        .style(ButtonStyle::Danger)
}

/// Whether `permissions` carry ban authority
#[must_use]
pub fn grants_ban(permissions: Permissions) -> bool {
    permissions.ban_members() || permissions.administrator()
}

#[async_trait]
impl Directory for DiscordGateway {
    async fn resolve_member(&self, guild_id: GuildId, user_id: UserId) -> Option<GuildMember> {
        match guild_id.member(&self.ctx, user_id).await {
            Ok(member) => Some(GuildMember {
                user_id,
                display_name: member.display_name().to_string(),
                roles: member.roles.iter().copied().collect(),
            }),
            Err(e) => {
                debug!(guild_id = %guild_id, user_id = %user_id, "Member lookup failed: {e}");
                None
            }
        }
    }

    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> HoneypotResult<bool> {
        let cached = self
            .ctx
            .cache
            .guild(guild_id)
            .map(|guild| guild.roles.contains_key(&role_id));
        if let Some(found) = cached {
            return Ok(found);
        }
        let roles = guild_id.roles(&self.ctx.http).await?;
        Ok(roles.contains_key(&role_id))
    }

    async fn actor_has_ban_authority(
        &self,
        guild_id: GuildId,
        actor: &Actor,
    ) -> HoneypotResult<bool> {
        let guild = guild_id
            .to_partial_guild(&self.ctx)
            .await
            .map_err(|e| HoneypotError::GuildUnavailable(format!("{guild_id}: {e}")))?;

        if guild.owner_id == actor.user_id {
            return Ok(true);
        }
        if let Some(permissions) = actor.permissions {
            return Ok(grants_ban(permissions));
        }

        // No resolved permissions on the interaction, fold them from the roles
        let member = guild.member(&self.ctx, actor.user_id).await?;
        let everyone = RoleId::new(guild_id.get());
        let permissions = member
            .roles
            .iter()
            .chain(std::iter::once(&everyone))
            .filter_map(|role_id| guild.roles.get(role_id))
            .fold(Permissions::empty(), |acc, role| acc | role.permissions);
        Ok(grants_ban(permissions))
    }
}

#[async_trait]
impl Moderation for DiscordGateway {
    async fn ban(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
        delete_message_days: u8,
    ) -> HoneypotResult<()> {
        guild_id
            .ban_with_reason(&self.ctx.http, user_id, delete_message_days, reason)
            .await?;
        info!(guild_id = %guild_id, user_id = %user_id, "Banned user");
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> HoneypotResult<()> {
        guild_id
            .kick_with_reason(&self.ctx.http, user_id, reason)
            .await?;
        info!(guild_id = %guild_id, user_id = %user_id, "Kicked user");
        Ok(())
    }

    async fn grant_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> HoneypotResult<()> {
        self.ctx
            .http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn revoke_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> HoneypotResult<()> {
        for role_id in roles {
            self.ctx
                .http
                .remove_member_role(guild_id, user_id, *role_id, Some(reason))
                .await?;
        }
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> HoneypotResult<()> {
        channel_id.delete_message(&self.ctx, message_id).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordGateway {
    async fn log(&self, entry: LogEntry) -> HoneypotResult<()> {
        let Some(channel_id) = entry.log_channel else {
            return Ok(());
        };
        self.text_channel(channel_id).await?;
        channel_id
            .send_message(&self.ctx, self.render(&entry))
            .await?;
        Ok(())
    }

    async fn respond_private(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> HoneypotResult<()> {
        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(text)
                .ephemeral(true),
        );
        self.ctx
            .http
            .create_interaction_response(interaction.id, &interaction.token, &response, Vec::new())
            .await?;
        Ok(())
    }

    async fn disable_control(
        &self,
        message: MessageRef,
        control: &ReviewControl,
    ) -> HoneypotResult<()> {
        let edit = EditMessage::new().components(vec![CreateActionRow::Buttons(vec![
            review_button(control).disabled(true),
        ])]);
        message
            .channel_id
            .edit_message(&self.ctx, message.message_id, edit)
            .await?;
        Ok(())
    }
}
