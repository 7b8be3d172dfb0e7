//! Honeypot pipeline
//!
//! Watches a guild's trap channel and punishes members who post in it. The
//! pipeline is split the way it runs: the trigger handler filters inbound
//! messages, the exemption evaluator decides immunity, the punishment engine
//! bans, kicks or demotes, and the review workflow offers a deferred ban
//! after the lesser punishments.

mod capability;
mod engine;
mod error;
mod exemption;
mod review;
mod trigger;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{
    Actor, ConfigStore, ConfigUpdate, Directory, GuildMember, InteractionRef, ListChange, ListOp,
    LogEntry, LogTarget, MessageRef, Moderation, Notifier, REVIEW_CONTROL_PREFIX, ReviewControl,
    RoleListField,
};
pub use engine::{BAN_DELETE_MESSAGE_DAYS, Outcome, PUNISHMENT_REASON};
pub use error::{HoneypotError, HoneypotResult};
pub use exemption::is_exempt;
pub use review::{
    ClickOutcome, REVIEW_LIFETIME_HOURS, ReviewClick, ReviewRegistry, ReviewState, ReviewToken,
};
pub use trigger::{Author, PostedMessage, TriggerEvent, TriggerOutcome};

use crate::data::GuildConfig;
use tracing::warn;

/// The capabilities one unit of work runs against.
///
/// Built per event; holds no state of its own beyond borrowed collaborators,
/// so concurrent events never share mutable pipeline state.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    pub config: &'a dyn ConfigStore,
    pub directory: &'a dyn Directory,
    pub moderation: &'a dyn Moderation,
    pub notifier: &'a dyn Notifier,
    pub reviews: &'a ReviewRegistry,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        config: &'a dyn ConfigStore,
        directory: &'a dyn Directory,
        moderation: &'a dyn Moderation,
        notifier: &'a dyn Notifier,
        reviews: &'a ReviewRegistry,
    ) -> Self {
        Self {
            config,
            directory,
            moderation,
            notifier,
            reviews,
        }
    }

    /// Write one audit entry to the guild's log channel. Delivery failures are
    /// traced and dropped.
    async fn emit(&self, config: &GuildConfig, report: Report) {
        let entry = LogEntry {
            guild_id: config.guild_id,
            log_channel: config.log_channel,
            description: report.description,
            target: report.target,
            control: report.control,
        };

        if let Err(e) = self.notifier.log(entry).await {
            warn!(
                target: crate::MODERATION_TARGET,
                guild_id = %config.guild_id,
                error = %e,
                "Failed to send honeypot log entry"
            );
        }
    }
}

/// Log line produced by a pipeline step, before it is bound to a channel
#[derive(Debug, Clone)]
struct Report {
    description: String,
    target: Option<LogTarget>,
    control: Option<ReviewControl>,
}

impl Report {
    fn about(target: LogTarget, description: String) -> Self {
        Self {
            description,
            target: Some(target),
            control: None,
        }
    }

    fn with_control(mut self, control: Option<ReviewControl>) -> Self {
        self.control = control;
        self
    }
}
