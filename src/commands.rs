//! Admin commands for configuring the honeypot
//!
//! Everything lives under the `honeypot` command group; all subcommands are
//! guild only and need the Administrator permission.

use crate::data::{GuildConfig, PunishmentAction};
use crate::honeypot::{ConfigStore, ConfigUpdate, ListChange, ListOp, RoleListField};
use crate::{Context, Error};
use poise::serenity_prelude::{
    ChannelId, CreateAllowedMentions, GuildChannel, GuildId, Mentionable, Role, RoleId,
};
use poise::{CreateReply, command};
use std::collections::{BTreeSet, HashSet};

/// Punishment choices offered by `honeypot action`
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ActionChoice {
    #[name = "ban"]
    Ban,
    #[name = "kick"]
    Kick,
    #[name = "role"]
    Role,
}

impl From<ActionChoice> for PunishmentAction {
    fn from(choice: ActionChoice) -> Self {
        match choice {
            ActionChoice::Ban => Self::Ban,
            ActionChoice::Kick => Self::Kick,
            ActionChoice::Role => Self::Role,
        }
    }
}

fn guild_of(ctx: Context<'_>) -> Result<GuildId, Error> {
    ctx.guild_id()
        .ok_or_else(|| "This command only works in a server".into())
}

/// Role ids the cached guild still knows about
fn live_roles(ctx: Context<'_>) -> HashSet<RoleId> {
    ctx.guild()
        .map(|guild| guild.roles.keys().copied().collect())
        .unwrap_or_default()
}

fn channel_label(channel: Option<ChannelId>) -> String {
    channel.map_or_else(|| "Not set".to_string(), |id| id.mention().to_string())
}

/// Summary shown by `honeypot` and `honeypot status`
#[must_use]
pub fn status_text(config: &GuildConfig) -> String {
    let punish_role = config
        .punish_role
        .map_or_else(|| "Not set".to_string(), |id| id.mention().to_string());
    let strip = if config.strip_other_roles { "yes" } else { "no" };

    [
        format!("Honeypot channel: {}", channel_label(config.trap_channel)),
        format!("Log channel: {}", channel_label(config.log_channel)),
        format!("Action: {}", config.action),
        format!("Punish role: {punish_role}"),
        format!("Strip other roles: {strip}"),
        format!("Strip exceptions: {}", config.strip_exceptions.len()),
        format!("Exempt roles: {}", config.exempt_roles.len()),
        String::new(),
        "Use subcommands: channel, log, action, role, strip, exempt, exception.".to_string(),
    ]
    .join("\n")
}

/// Reply for an add or remove on one of the role lists
#[must_use]
pub fn change_reply(field: RoleListField, change: ListChange, role: RoleId) -> String {
    let role = role.mention();
    match (field, change) {
        (RoleListField::ExemptRoles, ListChange::Added) => {
            format!("{role} added to the honeypot exemption list.")
        }
        (RoleListField::ExemptRoles, ListChange::AlreadyPresent) => {
            format!("{role} is already exempt.")
        }
        (RoleListField::ExemptRoles, ListChange::Removed) => {
            format!("{role} removed from the honeypot exemption list.")
        }
        (RoleListField::ExemptRoles, ListChange::NotPresent) => {
            format!("{role} is not in the exemption list.")
        }
        (RoleListField::StripExceptions, ListChange::Added) => {
            format!("{role} will be kept when roles are stripped.")
        }
        (RoleListField::StripExceptions, ListChange::AlreadyPresent) => {
            format!("{role} is already a strip exception.")
        }
        (RoleListField::StripExceptions, ListChange::Removed) => {
            format!("{role} removed from the strip exception list.")
        }
        (RoleListField::StripExceptions, ListChange::NotPresent) => {
            format!("{role} is not in the strip exception list.")
        }
    }
}

/// Listing for one of the role lists; roles the guild no longer has are skipped
#[must_use]
pub fn list_reply(
    field: RoleListField,
    stored: &BTreeSet<RoleId>,
    live: &HashSet<RoleId>,
) -> String {
    let (empty, stale, heading) = match field {
        RoleListField::ExemptRoles => (
            "No roles are currently exempt from the honeypot.",
            "No valid roles are exempt. You may need to reconfigure them.",
            "Exempt roles:",
        ),
        RoleListField::StripExceptions => (
            "No roles are kept when roles are stripped.",
            "No valid strip exceptions remain. You may need to reconfigure them.",
            "Strip exceptions:",
        ),
    };

    if stored.is_empty() {
        return empty.to_string();
    }
    let mentions: Vec<String> = stored
        .iter()
        .filter(|role| live.contains(role))
        .map(|role| role.mention().to_string())
        .collect();
    if mentions.is_empty() {
        return stale.to_string();
    }
    format!("{heading}\n{}", mentions.join(", "))
}

async fn mutate_role_list(
    ctx: Context<'_>,
    field: RoleListField,
    op: ListOp,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let role = match op {
        ListOp::Add(role) | ListOp::Remove(role) => role,
    };
    let change = ctx.data().configs.mutate_list(guild_id, field, op).await?;
    ctx.say(change_reply(field, change, role)).await?;
    Ok(())
}

async fn show_role_list(ctx: Context<'_>, field: RoleListField) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let config = ctx.data().configs.get(guild_id).await;
    let stored = match field {
        RoleListField::ExemptRoles => &config.exempt_roles,
        RoleListField::StripExceptions => &config.strip_exceptions,
    };
    let reply = list_reply(field, stored, &live_roles(ctx));
    ctx.send(
        CreateReply::default()
            .content(reply)
            .allowed_mentions(CreateAllowedMentions::new()),
    )
    .await?;
    Ok(())
}

async fn send_status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let config = ctx.data().configs.get(guild_id).await;
    ctx.send(
        CreateReply::default()
            .content(status_text(&config))
            .allowed_mentions(CreateAllowedMentions::new()),
    )
    .await?;
    Ok(())
}

/// Manage honeypot settings.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR",
    subcommands(
        "status", "channel", "log", "action", "role", "strip", "exempt", "exception"
    )
)]
pub async fn honeypot(ctx: Context<'_>) -> Result<(), Error> {
    send_status(ctx).await
}

/// Show the current honeypot settings.
#[command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    send_status(ctx).await
}

/// Set or update the honeypot channel.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    aliases("set")
)]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Channel that acts as the trap"]
    #[channel_types("Text")]
    channel: GuildChannel,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    ctx.data()
        .configs
        .set(guild_id, ConfigUpdate::TrapChannel(Some(channel.id)))
        .await?;
    ctx.say(format!("Honeypot channel set to {}", channel.id.mention()))
        .await?;
    Ok(())
}

/// Set or clear the honeypot log channel.
#[command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn log(
    ctx: Context<'_>,
    #[description = "Where honeypot logs go; leave empty to disable logging"]
    #[channel_types("Text")]
    channel: Option<GuildChannel>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let channel_id = channel.map(|channel| channel.id);
    ctx.data()
        .configs
        .set(guild_id, ConfigUpdate::LogChannel(channel_id))
        .await?;

    let reply = match channel_id {
        Some(id) => format!("Honeypot logs will be sent to {}.", id.mention()),
        None => "Honeypot logging disabled.".to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Choose what happens to members who post in the honeypot.
#[command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn action(
    ctx: Context<'_>,
    #[description = "ban, kick, or role"] action: ActionChoice,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let action = PunishmentAction::from(action);
    let configs = &ctx.data().configs;
    configs.set(guild_id, ConfigUpdate::Action(action)).await?;

    let mut reply = format!("Honeypot action set to {action}.");
    if action == PunishmentAction::Role && configs.get(guild_id).await.punish_role.is_none() {
        reply.push_str(" Set a punish role with `honeypot role` before it takes effect.");
    }
    ctx.say(reply).await?;
    Ok(())
}

/// Set or clear the role given by the role action.
#[command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn role(
    ctx: Context<'_>,
    #[description = "Role assigned to members who trip the honeypot"] role: Option<Role>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let role_id = role.map(|role| role.id);
    ctx.data()
        .configs
        .set(guild_id, ConfigUpdate::PunishRole(role_id))
        .await?;

    let reply = match role_id {
        Some(id) => format!("Punish role set to {}.", id.mention()),
        None => "Punish role cleared.".to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Toggle removing other roles when the punish role is assigned.
#[command(prefix_command, slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn strip(
    ctx: Context<'_>,
    #[description = "Remove the member's other roles"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    ctx.data()
        .configs
        .set(guild_id, ConfigUpdate::StripOtherRoles(enabled))
        .await?;
    let reply = if enabled {
        "Role stripping enabled."
    } else {
        "Role stripping disabled."
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Manage roles that are immune to the honeypot.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    aliases("ex"),
    subcommands("exempt_add", "exempt_remove", "exempt_list")
)]
pub async fn exempt(ctx: Context<'_>) -> Result<(), Error> {
    show_role_list(ctx, RoleListField::ExemptRoles).await
}

/// Exempt a role from the honeypot.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    rename = "add"
)]
pub async fn exempt_add(
    ctx: Context<'_>,
    #[description = "Role to exempt"] role: Role,
) -> Result<(), Error> {
    mutate_role_list(ctx, RoleListField::ExemptRoles, ListOp::Add(role.id)).await
}

/// Remove a role from the exemption list.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    rename = "remove"
)]
pub async fn exempt_remove(
    ctx: Context<'_>,
    #[description = "Role to stop exempting"] role: Role,
) -> Result<(), Error> {
    mutate_role_list(ctx, RoleListField::ExemptRoles, ListOp::Remove(role.id)).await
}

/// List exempt roles.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    rename = "list"
)]
pub async fn exempt_list(ctx: Context<'_>) -> Result<(), Error> {
    show_role_list(ctx, RoleListField::ExemptRoles).await
}

/// Manage roles kept when the role action strips the others.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("exception_add", "exception_remove", "exception_list")
)]
pub async fn exception(ctx: Context<'_>) -> Result<(), Error> {
    show_role_list(ctx, RoleListField::StripExceptions).await
}

/// Keep a role when roles are stripped.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    rename = "add"
)]
pub async fn exception_add(
    ctx: Context<'_>,
    #[description = "Role to keep"] role: Role,
) -> Result<(), Error> {
    mutate_role_list(ctx, RoleListField::StripExceptions, ListOp::Add(role.id)).await
}

/// Stop keeping a role when roles are stripped.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    rename = "remove"
)]
pub async fn exception_remove(
    ctx: Context<'_>,
    #[description = "Role to strip again"] role: Role,
) -> Result<(), Error> {
    mutate_role_list(ctx, RoleListField::StripExceptions, ListOp::Remove(role.id)).await
}

/// List strip exceptions.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    rename = "list"
)]
pub async fn exception_list(ctx: Context<'_>) -> Result<(), Error> {
    show_role_list(ctx, RoleListField::StripExceptions).await
}
