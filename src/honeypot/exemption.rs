use crate::data::GuildConfig;
use crate::honeypot::Directory;
use poise::serenity_prelude::UserId;
use tracing::debug;

/// Whether `user_id` holds one of the guild's exempt roles.
///
/// Skips the directory entirely when no roles are exempt. A member the
/// directory cannot resolve is not exempt.
pub async fn is_exempt(config: &GuildConfig, directory: &dyn Directory, user_id: UserId) -> bool {
    if config.exempt_roles.is_empty() {
        return false;
    }

    let Some(member) = directory.resolve_member(config.guild_id, user_id).await else {
        debug!(
            guild_id = %config.guild_id,
            user_id = %user_id,
            "Member not resolvable, not exempt"
        );
        return false;
    };

    !member.roles.is_disjoint(&config.exempt_roles)
}
