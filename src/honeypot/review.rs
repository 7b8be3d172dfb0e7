//! Review workflow
//!
//! After a kick or a role demotion the log entry carries a "Ban User" button.
//! Each button is bound to one [`ReviewToken`] held in the in-memory
//! [`ReviewRegistry`]; tokens are lost on restart.

use crate::honeypot::{
    Actor, BAN_DELETE_MESSAGE_DAYS, HoneypotError, HoneypotResult, InteractionRef, LogTarget,
    MessageRef, Pipeline, Report, ReviewControl,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use derive_more::Display;
use poise::serenity_prelude::{GuildId, Mentionable, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long a review control stays usable
pub const REVIEW_LIFETIME_HOURS: i64 = 24;

/// Review token lifecycle states
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReviewState {
    /// Waiting for a moderator
    #[default]
    Active,
    /// The target was banned through the control
    Resolved,
    /// The lifetime elapsed; the control is inert
    Expired,
}

/// A deferred ban offered after a lesser punishment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewToken {
    pub id: String,
    pub guild_id: GuildId,
    pub target_id: UserId,
    pub target_name: String,
    pub created_at: DateTime<Utc>,
    pub state: ReviewState,
}

impl ReviewToken {
    #[must_use]
    pub fn new(guild_id: GuildId, target_id: UserId, target_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            guild_id,
            target_id,
            target_name: target_name.into(),
            created_at: Utc::now(),
            state: ReviewState::Active,
        }
    }

    /// Whether the lifetime has elapsed at `now`
    #[must_use]
    pub fn is_past_lifetime(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::hours(REVIEW_LIFETIME_HOURS)
    }

    /// State as observed at `now`: an active token past its lifetime reads as expired
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> ReviewState {
        match self.state {
            ReviewState::Active if self.is_past_lifetime(now) => ReviewState::Expired,
            state => state,
        }
    }

    /// Record a successful ban, transitioning to Resolved
    ///
    /// # Errors
    /// Returns an error if the token is not Active
    pub fn resolve(&mut self) -> HoneypotResult<()> {
        if self.state != ReviewState::Active {
            return Err(HoneypotError::InvalidStateTransition);
        }
        self.state = ReviewState::Resolved;
        Ok(())
    }

    /// Transition to Expired
    ///
    /// # Errors
    /// Returns an error if the token is not Active
    pub fn expire(&mut self) -> HoneypotResult<()> {
        if self.state != ReviewState::Active {
            return Err(HoneypotError::InvalidStateTransition);
        }
        self.state = ReviewState::Expired;
        Ok(())
    }

    pub fn control(&self) -> ReviewControl {
        ReviewControl::new(self.id.clone())
    }
}

/// Store for review tokens, keyed by token id
#[derive(Clone, Default)]
pub struct ReviewRegistry {
    tokens: Arc<DashMap<String, ReviewToken>>,
}

impl ReviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a review for `target_id` and return its control.
    /// Tokens past their lifetime are swept first.
    pub fn open(&self, guild_id: GuildId, target_id: UserId, target_name: &str) -> ReviewControl {
        self.prune(Utc::now());
        let token = ReviewToken::new(guild_id, target_id, target_name);
        let control = token.control();
        self.add(token);
        control
    }

    pub fn add(&self, token: ReviewToken) {
        self.tokens.insert(token.id.clone(), token);
    }

    /// Snapshot of a token by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ReviewToken> {
        self.tokens.get(id).map(|entry| entry.value().clone())
    }

    /// Resolve a token by id
    ///
    /// # Errors
    /// Returns an error if the token is missing or no longer Active
    pub fn resolve(&self, id: &str) -> HoneypotResult<ReviewToken> {
        let mut token = self
            .tokens
            .get_mut(id)
            .ok_or_else(|| HoneypotError::ReviewNotFound(id.to_string()))?;
        token.resolve()?;
        Ok(token.clone())
    }

    /// Expire a token by id
    ///
    /// # Errors
    /// Returns an error if the token is missing or no longer Active
    pub fn expire(&self, id: &str) -> HoneypotResult<ReviewToken> {
        let mut token = self
            .tokens
            .get_mut(id)
            .ok_or_else(|| HoneypotError::ReviewNotFound(id.to_string()))?;
        token.expire()?;
        Ok(token.clone())
    }

    /// Drop every token whose lifetime has elapsed at `now`
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, token| !token.is_past_lifetime(now));
        before.saturating_sub(self.tokens.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A click on a review control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewClick {
    pub control: ReviewControl,
    /// `None` when the click did not come from a guild
    pub guild_id: Option<GuildId>,
    pub actor: Actor,
    pub interaction: InteractionRef,
    pub message: MessageRef,
}

/// What a click on a review control did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Banned,
    AlreadyResolved,
    Expired,
    Unauthorized,
    Unavailable,
    Failed(String),
}

impl Pipeline<'_> {
    /// Handle a click on a review control.
    ///
    /// The token stays Active until a ban succeeds, so concurrent clicks may
    /// both reach the (idempotent) ban call but only one resolves the token.
    pub async fn handle_review_click(&self, click: ReviewClick) -> ClickOutcome {
        let outcome = self.review_click(&click).await;
        let reply = match &outcome {
            ClickOutcome::Banned => None,
            ClickOutcome::AlreadyResolved => Some("This user has already been banned.".to_string()),
            ClickOutcome::Expired => Some("This review has expired.".to_string()),
            ClickOutcome::Unauthorized => {
                Some("You need the Ban Members permission to use this button.".to_string())
            }
            ClickOutcome::Unavailable => {
                Some("This server is unavailable right now. Try again later.".to_string())
            }
            ClickOutcome::Failed(reply) => Some(reply.clone()),
        };

        if let Some(reply) = reply {
            self.reply(&click.interaction, &reply).await;
        }
        outcome
    }

    async fn review_click(&self, click: &ReviewClick) -> ClickOutcome {
        let token_id = &click.control.token_id;
        let Some(token) = self.reviews.get(token_id) else {
            return ClickOutcome::Expired;
        };

        match token.state_at(Utc::now()) {
            ReviewState::Resolved => return ClickOutcome::AlreadyResolved,
            ReviewState::Expired => {
                // Lazily record the expiry; losing a race here is harmless
                let _ = self.reviews.expire(token_id);
                return ClickOutcome::Expired;
            }
            ReviewState::Active => {}
        }

        let Some(guild_id) = click.guild_id.filter(|id| *id == token.guild_id) else {
            return ClickOutcome::Unavailable;
        };

        match self
            .directory
            .actor_has_ban_authority(guild_id, &click.actor)
            .await
        {
            Ok(true) => {}
            Ok(false) => return ClickOutcome::Unauthorized,
            Err(e) => {
                warn!(guild_id = %guild_id, error = %e, "Ban authority check failed");
                return ClickOutcome::Unavailable;
            }
        }

        let reason = format!("Honeypot review approved by {}", click.actor.name);
        if let Err(e) = self
            .moderation
            .ban(guild_id, token.target_id, &reason, BAN_DELETE_MESSAGE_DAYS)
            .await
        {
            return ClickOutcome::Failed(format!(
                "Failed to ban {}: {e}. {}",
                token.target_name,
                e.remediation("Ban Members")
            ));
        }

        match self.reviews.resolve(token_id) {
            Ok(_) => {}
            // A concurrent click resolved the token first
            Err(HoneypotError::InvalidStateTransition) => return ClickOutcome::AlreadyResolved,
            // Swept from the registry while the ban was in flight; this click still banned
            Err(e) => debug!(token_id = %token_id, error = %e, "Review token gone after ban"),
        }

        info!(
            target: crate::MODERATION_TARGET,
            guild_id = %guild_id,
            user_id = %token.target_id,
            moderator_id = %click.actor.user_id,
            event = "review_banned",
            "Honeypot review resolved with a ban"
        );

        if let Err(e) = self
            .notifier
            .disable_control(click.message, &click.control)
            .await
        {
            warn!(guild_id = %guild_id, error = %e, "Failed to disable review control");
        }
        self.reply(
            &click.interaction,
            &format!("Banned {} ({}).", token.target_name, token.target_id),
        )
        .await;

        let config = self.config.get(guild_id).await;
        let target = LogTarget {
            user_id: token.target_id,
            name: token.target_name.clone(),
            avatar_url: None,
        };
        let description = format!(
            "{} ({}) was banned by {} after a honeypot review.",
            token.target_id.mention(),
            token.target_name,
            click.actor.user_id.mention()
        );
        self.emit(&config, Report::about(target, description)).await;

        ClickOutcome::Banned
    }

    async fn reply(&self, interaction: &InteractionRef, text: &str) {
        if let Err(e) = self.notifier.respond_private(interaction, text).await {
            warn!(error = %e, "Failed to answer review click");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GuildConfig;
    use crate::honeypot::capability::{
        MockConfigStore, MockDirectory, MockModeration, MockNotifier,
    };
    use crate::honeypot::testing::{FakeGuild, GUILD, TRAP, click_for, posted};
    use crate::honeypot::{Moderation, Outcome, TriggerOutcome};
    use async_trait::async_trait;
    use poise::serenity_prelude::{ChannelId, MessageId, Permissions, RoleId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config_store() -> MockConfigStore {
        let mut config = MockConfigStore::new();
        config.expect_get().returning(GuildConfig::new);
        config
    }

    /// Bans that suspend once mid-call, optionally sweeping `registry` meanwhile
    #[derive(Default)]
    struct SlowBan<'a> {
        calls: AtomicUsize,
        sweep: Option<&'a ReviewRegistry>,
    }

    impl SlowBan<'_> {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<'a> Moderation for SlowBan<'a> {
        async fn ban(
            &self,
            _guild_id: GuildId,
            _user_id: UserId,
            _reason: &str,
            _delete_message_days: u8,
        ) -> HoneypotResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if let Some(registry) = self.sweep {
                registry.prune(Utc::now() + Duration::hours(REVIEW_LIFETIME_HOURS + 1));
            }
            Ok(())
        }

        async fn kick(&self, _: GuildId, _: UserId, _: &str) -> HoneypotResult<()> {
            unreachable!("review clicks never kick")
        }

        async fn grant_role(
            &self,
            _: GuildId,
            _: UserId,
            _: RoleId,
            _: &str,
        ) -> HoneypotResult<()> {
            unreachable!("review clicks never grant roles")
        }

        async fn revoke_roles(
            &self,
            _: GuildId,
            _: UserId,
            _: &[RoleId],
            _: &str,
        ) -> HoneypotResult<()> {
            unreachable!("review clicks never strip roles")
        }

        async fn delete_message(&self, _: ChannelId, _: MessageId) -> HoneypotResult<()> {
            unreachable!("review clicks never delete messages")
        }
    }

    fn stale_token() -> ReviewToken {
        let mut token = ReviewToken::new(GUILD, UserId::new(500), "trapped");
        token.created_at = Utc::now() - Duration::hours(REVIEW_LIFETIME_HOURS + 1);
        token
    }

    #[test]
    fn test_token_state_transitions() {
        let mut token = ReviewToken::new(GUILD, UserId::new(500), "trapped");
        assert_eq!(token.state, ReviewState::Active);

        token.resolve().unwrap();
        assert_eq!(token.state, ReviewState::Resolved);

        // Terminal states accept no further transitions
        assert!(token.resolve().is_err());
        assert!(token.expire().is_err());

        let mut token = ReviewToken::new(GUILD, UserId::new(500), "trapped");
        token.expire().unwrap();
        assert_eq!(token.state, ReviewState::Expired);
        assert!(token.resolve().is_err());
    }

    #[test]
    fn test_token_past_lifetime_reads_expired() {
        let token = stale_token();
        assert_eq!(token.state, ReviewState::Active);
        assert_eq!(token.state_at(Utc::now()), ReviewState::Expired);

        let fresh = ReviewToken::new(GUILD, UserId::new(500), "trapped");
        assert_eq!(fresh.state_at(Utc::now()), ReviewState::Active);
    }

    #[test]
    fn test_open_sweeps_stale_tokens() {
        let registry = ReviewRegistry::new();
        let stale = stale_token();
        let stale_id = stale.id.clone();
        registry.add(stale);

        let control = registry.open(GUILD, UserId::new(501), "other");
        assert!(registry.get(&stale_id).is_none());
        assert!(registry.get(&control.token_id).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_resolve_once() {
        let registry = ReviewRegistry::new();
        let control = registry.open(GUILD, UserId::new(500), "trapped");

        let token = registry.resolve(&control.token_id).unwrap();
        assert_eq!(token.state, ReviewState::Resolved);
        assert!(matches!(
            registry.resolve(&control.token_id),
            Err(HoneypotError::InvalidStateTransition)
        ));
        assert!(matches!(
            registry.resolve("missing"),
            Err(HoneypotError::ReviewNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_click_bans_and_resolves() {
        let config = config_store();
        let mut directory = MockDirectory::new();
        directory
            .expect_actor_has_ban_authority()
            .times(1)
            .returning(|_, _| Ok(true));
        let mut moderation = MockModeration::new();
        moderation
            .expect_ban()
            .withf(|guild_id, user_id, _, _| *guild_id == GUILD && *user_id == UserId::new(500))
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_disable_control()
            .times(1)
            .returning(|_, _| Ok(()));
        notifier
            .expect_respond_private()
            .withf(|_, text| text.contains("Banned trapped"))
            .times(1)
            .returning(|_, _| Ok(()));
        notifier
            .expect_log()
            .withf(|entry| entry.description.contains("after a honeypot review"))
            .times(1)
            .returning(|_| Ok(()));
        let reviews = ReviewRegistry::new();
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        let outcome = pipeline
            .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert_eq!(outcome, ClickOutcome::Banned);
        assert_eq!(
            reviews.get(&control.token_id).map(|token| token.state),
            Some(ReviewState::Resolved)
        );
    }

    #[tokio::test]
    async fn test_resolved_token_rejects_further_clicks() {
        let config = config_store();
        let mut directory = MockDirectory::new();
        directory.expect_actor_has_ban_authority().never();
        let mut moderation = MockModeration::new();
        moderation.expect_ban().never();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_respond_private()
            .withf(|_, text| text.contains("already been banned"))
            .times(2)
            .returning(|_, _| Ok(()));
        let reviews = ReviewRegistry::new();
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        reviews.resolve(&control.token_id).unwrap();
        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        for _ in 0..2 {
            let outcome = pipeline
                .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
                .await;
            assert_eq!(outcome, ClickOutcome::AlreadyResolved);
        }
    }

    #[tokio::test]
    async fn test_stale_token_behaves_like_expired() {
        let config = config_store();
        let mut directory = MockDirectory::new();
        directory.expect_actor_has_ban_authority().never();
        let mut moderation = MockModeration::new();
        moderation.expect_ban().never();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_respond_private()
            .withf(|_, text| text.contains("expired"))
            .times(2)
            .returning(|_, _| Ok(()));
        let reviews = ReviewRegistry::new();

        let stale = stale_token();
        let stale_control = stale.control();
        reviews.add(stale);

        let mut expired = ReviewToken::new(GUILD, UserId::new(501), "other");
        expired.expire().unwrap();
        let expired_control = expired.control();
        reviews.add(expired);

        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        let stale_outcome = pipeline
            .handle_review_click(click_for(&stale_control, Some(Permissions::BAN_MEMBERS)))
            .await;
        let expired_outcome = pipeline
            .handle_review_click(click_for(&expired_control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert_eq!(stale_outcome, ClickOutcome::Expired);
        assert_eq!(stale_outcome, expired_outcome);
        assert_eq!(
            reviews.get(&stale_control.token_id).map(|token| token.state),
            Some(ReviewState::Expired)
        );
    }

    #[tokio::test]
    async fn test_unauthorized_click_stays_active() {
        let config = config_store();
        let mut directory = MockDirectory::new();
        directory
            .expect_actor_has_ban_authority()
            .returning(|_, _| Ok(false));
        let mut moderation = MockModeration::new();
        moderation.expect_ban().never();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_respond_private()
            .withf(|_, text| text.contains("Ban Members permission"))
            .times(1)
            .returning(|_, _| Ok(()));
        let reviews = ReviewRegistry::new();
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        let outcome = pipeline.handle_review_click(click_for(&control, None)).await;
        assert_eq!(outcome, ClickOutcome::Unauthorized);
        assert_eq!(
            reviews.get(&control.token_id).map(|token| token.state),
            Some(ReviewState::Active)
        );
    }

    #[tokio::test]
    async fn test_unreachable_guild_stays_active() {
        let config = config_store();
        let mut directory = MockDirectory::new();
        directory.expect_actor_has_ban_authority().returning(|_, _| {
            Err(HoneypotError::GuildUnavailable("gone".to_string()))
        });
        let mut moderation = MockModeration::new();
        moderation.expect_ban().never();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_respond_private()
            .withf(|_, text| text.contains("unavailable"))
            .times(1)
            .returning(|_, _| Ok(()));
        let reviews = ReviewRegistry::new();
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        let outcome = pipeline
            .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert_eq!(outcome, ClickOutcome::Unavailable);
        assert_eq!(
            reviews.get(&control.token_id).map(|token| token.state),
            Some(ReviewState::Active)
        );
    }

    #[tokio::test]
    async fn test_failed_ban_is_retryable() {
        let config = config_store();
        let mut directory = MockDirectory::new();
        directory
            .expect_actor_has_ban_authority()
            .times(2)
            .returning(|_, _| Ok(true));
        let mut sequence = mockall::Sequence::new();
        let mut moderation = MockModeration::new();
        moderation
            .expect_ban()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _, _| Err(HoneypotError::HierarchyViolation));
        moderation
            .expect_ban()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _, _| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier.expect_respond_private().times(2).returning(|_, _| Ok(()));
        notifier.expect_disable_control().times(1).returning(|_, _| Ok(()));
        notifier.expect_log().times(1).returning(|_| Ok(()));
        let reviews = ReviewRegistry::new();
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        let first = pipeline
            .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert!(matches!(first, ClickOutcome::Failed(ref reply) if reply.contains("Ban Members")));
        assert_eq!(
            reviews.get(&control.token_id).map(|token| token.state),
            Some(ReviewState::Active)
        );

        let second = pipeline
            .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert_eq!(second, ClickOutcome::Banned);
    }

    #[tokio::test]
    async fn test_kick_then_review_ban() {
        let guild = FakeGuild::new();
        let member = guild.add_member(500, &[]);
        guild.configure(|config| {
            config.trap_channel = Some(TRAP);
            config.action = crate::data::PunishmentAction::Kick;
        });
        let reviews = ReviewRegistry::new();
        let pipeline = guild.pipeline(&reviews);

        let outcome = pipeline.handle_message(posted(member, TRAP)).await;
        let TriggerOutcome::Punished(Outcome::Kicked { review }) = outcome else {
            panic!("Expected kick, got {outcome:?}");
        };

        // A moderator without ban authority cannot use the control
        let denied = pipeline.handle_review_click(click_for(&review, None)).await;
        assert_eq!(denied, ClickOutcome::Unauthorized);
        assert!(!guild.is_banned(member));

        let banned = pipeline
            .handle_review_click(click_for(&review, Some(Permissions::ADMINISTRATOR)))
            .await;
        assert_eq!(banned, ClickOutcome::Banned);
        assert!(guild.is_banned(member));
        assert_eq!(guild.logs().len(), 2);

        let replies = guild.replies();
        assert_eq!(replies.len(), 2);
        assert!(replies[1].starts_with("Banned"));
    }

    #[tokio::test]
    async fn test_unknown_token_reads_expired() {
        let config = config_store();
        let directory = MockDirectory::new();
        let mut moderation = MockModeration::new();
        moderation.expect_ban().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_respond_private().times(1).returning(|_, _| Ok(()));
        let reviews = ReviewRegistry::new();
        let pipeline = Pipeline::new(&config, &directory, &moderation, &notifier, &reviews);

        let outcome = pipeline
            .handle_review_click(click_for(&ReviewControl::new("gone"), None))
            .await;
        assert_eq!(outcome, ClickOutcome::Expired);
    }

    #[tokio::test]
    async fn test_concurrent_clicks_resolve_once() {
        let guild = FakeGuild::new();
        let moderation = SlowBan::default();
        let reviews = ReviewRegistry::new();
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        let pipeline = Pipeline::new(&guild, &guild, &moderation, &guild, &reviews);

        let (a, b) = tokio::join!(
            pipeline.handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS))),
            pipeline.handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS))),
        );
        let outcomes = [a, b];
        let banned = outcomes.iter().filter(|o| **o == ClickOutcome::Banned).count();
        let resolved = outcomes
            .iter()
            .filter(|o| **o == ClickOutcome::AlreadyResolved)
            .count();
        assert_eq!((banned, resolved), (1, 1));
        assert_eq!(guild.logs().len(), 1);
        assert_eq!(guild.disabled_controls(), vec![control.clone()]);

        let replies = guild.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies.iter().filter(|r| r.starts_with("Banned trapped")).count(),
            1
        );

        let calls = moderation.calls();
        let third = pipeline
            .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert_eq!(third, ClickOutcome::AlreadyResolved);
        assert_eq!(moderation.calls(), calls);
    }

    #[tokio::test]
    async fn test_token_swept_during_ban_still_completes() {
        let guild = FakeGuild::new();
        let reviews = ReviewRegistry::new();
        let moderation = SlowBan {
            sweep: Some(&reviews),
            ..Default::default()
        };
        let control = reviews.open(GUILD, UserId::new(500), "trapped");
        let pipeline = Pipeline::new(&guild, &guild, &moderation, &guild, &reviews);

        let outcome = pipeline
            .handle_review_click(click_for(&control, Some(Permissions::BAN_MEMBERS)))
            .await;
        assert_eq!(outcome, ClickOutcome::Banned);
        assert!(reviews.get(&control.token_id).is_none());
        assert_eq!(moderation.calls(), 1);
        assert_eq!(guild.disabled_controls(), vec![control]);
        assert_eq!(guild.replies(), vec!["Banned trapped (500).".to_string()]);

        let logs = guild.logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].description.contains("after a honeypot review"));
    }
}
