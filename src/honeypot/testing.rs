//! In-memory guild used by the pipeline tests
//!
//! Mocks cover single calls; `FakeGuild` keeps enough state to check what a
//! whole scenario did to a member.

use crate::data::GuildConfig;
use crate::honeypot::{
    Actor, Author, ConfigStore, ConfigUpdate, Directory, GuildMember, HoneypotError,
    HoneypotResult, InteractionRef, ListChange, ListOp, LogEntry, MessageRef, Moderation,
    Notifier, Pipeline, PostedMessage, ReviewClick, ReviewControl, ReviewRegistry, RoleListField,
    TriggerEvent,
};
use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, GuildId, InteractionId, MessageId, Permissions, RoleId, UserId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

pub const GUILD: GuildId = GuildId::new(1000);
pub const TRAP: ChannelId = ChannelId::new(2000);

fn author(user_id: UserId) -> Author {
    Author {
        id: user_id,
        name: format!("user{user_id}"),
        avatar_url: None,
        automated: false,
    }
}

/// A human's message in `channel_id` of [`GUILD`]
pub fn posted(user_id: UserId, channel_id: ChannelId) -> PostedMessage {
    PostedMessage {
        guild_id: Some(GUILD),
        channel_id,
        message_id: MessageId::new(3000),
        author: author(user_id),
    }
}

/// A trap channel hit by `user_id`
pub fn event_for(user_id: UserId) -> TriggerEvent {
    TriggerEvent::new(GUILD, TRAP, MessageId::new(3000), author(user_id))
}

/// A click on `control` in [`GUILD`] by a moderator holding `permissions`
pub fn click_for(control: &ReviewControl, permissions: Option<Permissions>) -> ReviewClick {
    ReviewClick {
        control: control.clone(),
        guild_id: Some(GUILD),
        actor: Actor {
            user_id: UserId::new(42),
            name: "moderator".to_string(),
            permissions,
        },
        interaction: InteractionRef {
            id: InteractionId::new(4000),
            token: "interaction-token".to_string(),
        },
        message: MessageRef {
            channel_id: ChannelId::new(900),
            message_id: MessageId::new(5000),
        },
    }
}

#[derive(Default)]
struct State {
    config: Option<GuildConfig>,
    roles: BTreeSet<RoleId>,
    members: BTreeMap<UserId, BTreeSet<RoleId>>,
    banned: BTreeSet<UserId>,
    deleted: Vec<MessageId>,
    logs: Vec<LogEntry>,
    replies: Vec<String>,
    disabled: Vec<ReviewControl>,
}

/// A single guild that applies moderation calls to its own member table
#[derive(Default)]
pub struct FakeGuild {
    state: Mutex<State>,
}

impl FakeGuild {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_role(&self, role_id: RoleId) {
        self.with(|state| {
            state.roles.insert(role_id);
        });
    }

    /// Adds a member holding `roles`; the roles are registered with the guild
    pub fn add_member(&self, user_id: u64, roles: &[RoleId]) -> UserId {
        let user_id = UserId::new(user_id);
        self.with(|state| {
            state.roles.extend(roles.iter().copied());
            state.members.insert(user_id, roles.iter().copied().collect());
        });
        user_id
    }

    pub fn configure(&self, f: impl FnOnce(&mut GuildConfig)) {
        self.with(|state| f(state.config.get_or_insert_with(|| GuildConfig::new(GUILD))));
    }

    pub fn config(&self) -> GuildConfig {
        self.with(|state| state.config.clone().unwrap_or_else(|| GuildConfig::new(GUILD)))
    }

    pub fn pipeline<'a>(&'a self, reviews: &'a ReviewRegistry) -> Pipeline<'a> {
        Pipeline::new(self, self, self, self, reviews)
    }

    pub fn roles_of(&self, user_id: UserId) -> Option<BTreeSet<RoleId>> {
        self.with(|state| state.members.get(&user_id).cloned())
    }

    pub fn is_member(&self, user_id: UserId) -> bool {
        self.with(|state| state.members.contains_key(&user_id))
    }

    pub fn is_banned(&self, user_id: UserId) -> bool {
        self.with(|state| state.banned.contains(&user_id))
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.with(|state| state.logs.clone())
    }

    pub fn replies(&self) -> Vec<String> {
        self.with(|state| state.replies.clone())
    }

    pub fn deleted_messages(&self) -> Vec<MessageId> {
        self.with(|state| state.deleted.clone())
    }

    pub fn disabled_controls(&self) -> Vec<ReviewControl> {
        self.with(|state| state.disabled.clone())
    }
}

fn unknown_member() -> HoneypotError {
    HoneypotError::TargetNotFound("Unknown Member".to_string())
}

#[async_trait]
impl ConfigStore for FakeGuild {
    async fn get(&self, guild_id: GuildId) -> GuildConfig {
        self.with(|state| {
            state
                .config
                .clone()
                .filter(|config| config.guild_id == guild_id)
                .unwrap_or_else(|| GuildConfig::new(guild_id))
        })
    }

    async fn set(&self, _guild_id: GuildId, update: ConfigUpdate) -> HoneypotResult<()> {
        self.configure(|config| config.apply(update));
        Ok(())
    }

    async fn mutate_list(
        &self,
        _guild_id: GuildId,
        field: RoleListField,
        op: ListOp,
    ) -> HoneypotResult<ListChange> {
        let mut change = ListChange::NotPresent;
        self.configure(|config| {
            let list = config.list_mut(field);
            change = match op {
                ListOp::Add(role) if list.insert(role) => ListChange::Added,
                ListOp::Add(_) => ListChange::AlreadyPresent,
                ListOp::Remove(role) if list.remove(&role) => ListChange::Removed,
                ListOp::Remove(_) => ListChange::NotPresent,
            };
        });
        Ok(change)
    }
}

#[async_trait]
impl Directory for FakeGuild {
    async fn resolve_member(&self, _guild_id: GuildId, user_id: UserId) -> Option<GuildMember> {
        self.roles_of(user_id).map(|roles| GuildMember {
            user_id,
            display_name: format!("user{user_id}"),
            roles,
        })
    }

    async fn role_exists(&self, _guild_id: GuildId, role_id: RoleId) -> HoneypotResult<bool> {
        Ok(self.with(|state| state.roles.contains(&role_id)))
    }

    async fn actor_has_ban_authority(
        &self,
        _guild_id: GuildId,
        actor: &Actor,
    ) -> HoneypotResult<bool> {
        Ok(actor.permissions.is_some_and(crate::discord::grants_ban))
    }
}

#[async_trait]
impl Moderation for FakeGuild {
    async fn ban(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        _reason: &str,
        _delete_message_days: u8,
    ) -> HoneypotResult<()> {
        self.with(|state| {
            state.members.remove(&user_id);
            state.banned.insert(user_id);
        });
        Ok(())
    }

    async fn kick(&self, _guild_id: GuildId, user_id: UserId, _reason: &str) -> HoneypotResult<()> {
        self.with(|state| state.members.remove(&user_id).map(|_| ()))
            .ok_or_else(unknown_member)
    }

    async fn grant_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> HoneypotResult<()> {
        self.with(|state| {
            if !state.roles.contains(&role_id) {
                return Err(HoneypotError::NotConfigured("Unknown Role".to_string()));
            }
            let roles = state.members.get_mut(&user_id).ok_or_else(unknown_member)?;
            roles.insert(role_id);
            Ok(())
        })
    }

    async fn revoke_roles(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
        _reason: &str,
    ) -> HoneypotResult<()> {
        self.with(|state| {
            let held = state.members.get_mut(&user_id).ok_or_else(unknown_member)?;
            for role in roles {
                held.remove(role);
            }
            Ok(())
        })
    }

    async fn delete_message(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
    ) -> HoneypotResult<()> {
        self.with(|state| state.deleted.push(message_id));
        Ok(())
    }
}

#[async_trait]
impl Notifier for FakeGuild {
    async fn log(&self, entry: LogEntry) -> HoneypotResult<()> {
        self.with(|state| state.logs.push(entry));
        Ok(())
    }

    async fn respond_private(
        &self,
        _interaction: &InteractionRef,
        text: &str,
    ) -> HoneypotResult<()> {
        self.with(|state| state.replies.push(text.to_string()));
        Ok(())
    }

    async fn disable_control(
        &self,
        _message: MessageRef,
        control: &ReviewControl,
    ) -> HoneypotResult<()> {
        self.with(|state| state.disabled.push(control.clone()));
        Ok(())
    }
}
