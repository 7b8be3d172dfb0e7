use crate::discord::DiscordGateway;
use crate::honeypot::{
    Actor, Author, ClickOutcome, InteractionRef, MessageRef, Pipeline, PostedMessage,
    ReviewClick, ReviewControl, TriggerOutcome,
};
use crate::{Data, EVENT_TARGET};
use poise::serenity_prelude::{
    self as serenity, ComponentInteraction, Context, EventHandler, GuildId, Interaction, Message,
    Ready,
};
use tracing::{debug, info, warn};

/// Gateway event handler driving the honeypot pipeline
pub struct Handler {
    pub data: Data,
}

impl Handler {
    #[must_use]
    pub fn new(data: Data) -> Self {
        Self { data }
    }
}

/// Flatten a gateway message into the pipeline's inbound event
#[must_use]
pub fn posted_message(message: &Message) -> PostedMessage {
    PostedMessage {
        guild_id: message.guild_id,
        channel_id: message.channel_id,
        message_id: message.id,
        author: Author {
            id: message.author.id,
            name: message.author.name.clone(),
            avatar_url: Some(message.author.face()),
            automated: message.author.bot
                || message.author.system
                || message.webhook_id.is_some(),
        },
    }
}

/// Build a review click from a component interaction, if it targets a review control
#[must_use]
pub fn review_click(component: &ComponentInteraction) -> Option<ReviewClick> {
    let control = ReviewControl::parse(&component.data.custom_id)?;
    Some(ReviewClick {
        control,
        guild_id: component.guild_id,
        actor: Actor {
            user_id: component.user.id,
            name: component.user.name.clone(),
            permissions: component
                .member
                .as_ref()
                .and_then(|member| member.permissions),
        },
        interaction: InteractionRef {
            id: component.id,
            token: component.token.clone(),
        },
        message: MessageRef {
            channel_id: component.message.channel_id,
            message_id: component.message.id,
        },
    })
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!(
            "Cache ready! Watching {guild_count} guild(s), {} configured",
            self.data.configs.len()
        );
    }

    async fn message(&self, ctx: Context, new_message: Message) {
        // Automated senders and DMs are filtered by the pipeline
        let posted = posted_message(&new_message);
        let gateway = DiscordGateway::new(ctx);
        let pipeline = Pipeline::new(
            &self.data.configs,
            &gateway,
            &gateway,
            &gateway,
            &self.data.reviews,
        );
        let outcome = pipeline.handle_message(posted).await;
        if outcome != TriggerOutcome::Ignored {
            debug!(
                target: EVENT_TARGET,
                message_id = %new_message.id,
                outcome = ?outcome,
                "Honeypot message handled"
            );
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };
        let Some(click) = review_click(&component) else {
            return;
        };

        let gateway = DiscordGateway::new(ctx);
        let pipeline = Pipeline::new(
            &self.data.configs,
            &gateway,
            &gateway,
            &gateway,
            &self.data.reviews,
        );
        let outcome = pipeline.handle_review_click(click).await;
        if matches!(outcome, ClickOutcome::Failed(_)) {
            warn!(
                target: EVENT_TARGET,
                user_id = %component.user.id,
                outcome = ?outcome,
                "Review click failed"
            );
        } else {
            debug!(
                target: EVENT_TARGET,
                user_id = %component.user.id,
                outcome = ?outcome,
                "Review click handled"
            );
        }
    }
}
