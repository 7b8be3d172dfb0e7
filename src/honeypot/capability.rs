//! Capabilities the honeypot pipeline consumes
//!
//! The pipeline never talks to Discord directly. It reads settings through a
//! [`ConfigStore`], looks members up through a [`Directory`], acts through
//! [`Moderation`] and reports through a [`Notifier`]. The serenity-backed
//! implementations live in `crate::discord`; tests use mocks and fakes.

use crate::data::{GuildConfig, PunishmentAction};
use crate::honeypot::HoneypotResult;
use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, GuildId, InteractionId, MessageId, Permissions, RoleId, UserId,
};
use std::collections::BTreeSet;

#[cfg(test)]
use mockall::automock;

/// Prefix of the custom id carried by review buttons
pub const REVIEW_CONTROL_PREFIX: &str = "honeypot-review:";

/// A single field update issued by an admin command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigUpdate {
    TrapChannel(Option<ChannelId>),
    LogChannel(Option<ChannelId>),
    Action(PunishmentAction),
    PunishRole(Option<RoleId>),
    StripOtherRoles(bool),
}

/// Role list fields of a guild config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleListField {
    ExemptRoles,
    StripExceptions,
}

/// Read-modify-write operation on a role list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    Add(RoleId),
    Remove(RoleId),
}

/// What a [`ListOp`] actually changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

/// Snapshot of a guild member as seen by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMember {
    pub user_id: UserId,
    pub display_name: String,
    /// Roles currently held, excluding the implicit everyone role
    pub roles: BTreeSet<RoleId>,
}

/// The moderator who clicked a review control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub name: String,
    /// Permissions Discord resolved for the actor with the interaction, if any
    pub permissions: Option<Permissions>,
}

/// Who a log entry is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Handle to the interactive "Ban User" control bound to one review token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewControl {
    pub token_id: String,
}

impl ReviewControl {
    #[must_use]
    pub fn new(token_id: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
        }
    }

    /// Custom id sent to Discord with the button
    #[must_use]
    pub fn custom_id(&self) -> String {
        format!("{REVIEW_CONTROL_PREFIX}{}", self.token_id)
    }

    /// Recover the control from a button's custom id
    #[must_use]
    pub fn parse(custom_id: &str) -> Option<Self> {
        custom_id
            .strip_prefix(REVIEW_CONTROL_PREFIX)
            .filter(|token_id| !token_id.is_empty())
            .map(Self::new)
    }
}

/// A rendered audit entry destined for a guild's log channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub guild_id: GuildId,
    /// Unset means logging is disabled for the guild
    pub log_channel: Option<ChannelId>,
    pub description: String,
    pub target: Option<LogTarget>,
    pub control: Option<ReviewControl>,
}

/// Enough of an interaction to answer it later
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRef {
    pub id: InteractionId,
    pub token: String,
}

/// A previously sent message carrying a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Durable per-guild settings
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Current settings, or defaults for a guild never configured
    async fn get(&self, guild_id: GuildId) -> GuildConfig;

    async fn set(&self, guild_id: GuildId, update: ConfigUpdate) -> HoneypotResult<()>;

    /// Atomic read-modify-write on a role list field
    async fn mutate_list(
        &self,
        guild_id: GuildId,
        field: RoleListField,
        op: ListOp,
    ) -> HoneypotResult<ListChange>;
}

/// Member, role and permission lookups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    /// `None` when the member cannot be resolved, for example after leaving
    async fn resolve_member(&self, guild_id: GuildId, user_id: UserId) -> Option<GuildMember>;

    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> HoneypotResult<bool>;

    /// Whether the actor may ban members right now.
    ///
    /// Fails with `GuildUnavailable` when the guild cannot be reached.
    async fn actor_has_ban_authority(&self, guild_id: GuildId, actor: &Actor)
    -> HoneypotResult<bool>;
}

/// Moderation calls against the platform
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Moderation: Send + Sync {
    /// Ban by user id; banning an already banned user succeeds
    async fn ban(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
        delete_message_days: u8,
    ) -> HoneypotResult<()>;

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> HoneypotResult<()>;

    async fn grant_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> HoneypotResult<()>;

    /// Removes roles one by one and stops at the first failure.
    /// Roles removed before the failure stay removed.
    async fn revoke_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> HoneypotResult<()>;

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> HoneypotResult<()>;
}

/// Message delivery
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an audit entry. Does nothing when the entry has no log channel.
    async fn log(&self, entry: LogEntry) -> HoneypotResult<()>;

    async fn respond_private(&self, interaction: &InteractionRef, text: &str)
    -> HoneypotResult<()>;

    /// Render the control on `message` as permanently disabled
    async fn disable_control(
        &self,
        message: MessageRef,
        control: &ReviewControl,
    ) -> HoneypotResult<()>;
}
