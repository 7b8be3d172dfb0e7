use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use crate::honeypot::{
    ConfigStore, ConfigUpdate, HoneypotResult, ListChange, ListOp, ReviewRegistry, RoleListField,
};
use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serenity::{ChannelId, GuildId, RoleId};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Punishment branch taken when a member trips the honeypot
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunishmentAction {
    #[default]
    Ban,
    Kick,
    Role,
}

impl PunishmentAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Role => "role",
        }
    }

    /// Parse a stored action name. Unknown or legacy names fall back to `Ban`.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl Display for PunishmentAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PunishmentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ban" => Ok(Self::Ban),
            "kick" => Ok(Self::Kick),
            "role" => Ok(Self::Role),
            other => Err(format!("unknown punishment action: {other}")),
        }
    }
}

impl Serialize for PunishmentAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PunishmentAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_stored(&value))
    }
}

/// Honeypot settings for a single guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    // The ID of the guild
    pub guild_id: GuildId,
    // Channel watched for triggers; unset disables the honeypot
    pub trap_channel: Option<ChannelId>,
    // Destination for audit entries; unset disables logging
    pub log_channel: Option<ChannelId>,
    pub action: PunishmentAction,
    // Only meaningful when action is Role
    pub punish_role: Option<RoleId>,
    pub strip_other_roles: bool,
    pub strip_exceptions: BTreeSet<RoleId>,
    pub exempt_roles: BTreeSet<RoleId>,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            guild_id: GuildId::new(1),
            trap_channel: None,
            log_channel: None,
            action: PunishmentAction::Ban,
            punish_role: None,
            strip_other_roles: false,
            strip_exceptions: BTreeSet::new(),
            exempt_roles: BTreeSet::new(),
        }
    }
}

impl GuildConfig {
    /// Default settings for a guild
    #[must_use]
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            ..Default::default()
        }
    }

    /// Roles kept while stripping: the configured exceptions plus the punish role itself
    #[must_use]
    pub fn preserved_roles(&self) -> BTreeSet<RoleId> {
        let mut preserved = self.strip_exceptions.clone();
        preserved.extend(self.punish_role);
        preserved
    }

    pub(crate) fn apply(&mut self, update: ConfigUpdate) {
        match update {
            ConfigUpdate::TrapChannel(channel) => self.trap_channel = channel,
            ConfigUpdate::LogChannel(channel) => self.log_channel = channel,
            ConfigUpdate::Action(action) => self.action = action,
            ConfigUpdate::PunishRole(role) => self.punish_role = role,
            ConfigUpdate::StripOtherRoles(strip) => self.strip_other_roles = strip,
        }
    }

    pub(crate) fn list_mut(&mut self, field: RoleListField) -> &mut BTreeSet<RoleId> {
        match field {
            RoleListField::ExemptRoles => &mut self.exempt_roles,
            RoleListField::StripExceptions => &mut self.strip_exceptions,
        }
    }
}

/// YAML-backed guild settings store
#[derive(Debug)]
pub struct GuildConfigStore {
    // Map of guild_id -> guild configuration
    configs: DashMap<GuildId, GuildConfig>,
    path: PathBuf,
    // Serializes writers of the settings file
    save_lock: Mutex<()>,
}

impl GuildConfigStore {
    /// Create an empty store that persists to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            configs: DashMap::new(),
            path: path.into(),
            save_lock: Mutex::new(()),
        }
    }

    /// Load settings from the YAML file at `path`.
    ///
    /// A missing or unreadable file yields an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);

        match tokio::fs::read_to_string(&store.path).await {
            Ok(file_content) => match serde_yaml::from_str::<Vec<GuildConfig>>(&file_content) {
                Ok(configs) => {
                    for config in configs {
                        store.configs.insert(config.guild_id, config);
                    }
                    info!(
                        path = %store.path.display(),
                        guilds = store.configs.len(),
                        "Loaded honeypot settings"
                    );
                }
                Err(e) => {
                    warn!(path = %store.path.display(), "Ignoring unreadable settings file: {e}");
                }
            },
            Err(_) => info!(path = %store.path.display(), "No settings file, starting empty"),
        }

        store
    }

    /// Write all guild configurations to the YAML file
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, the configs cannot
    /// be serialized, or the file cannot be written.
    pub async fn save(&self) -> HoneypotResult<()> {
        let _guard = self.save_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !Path::new(parent).exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut configs: Vec<GuildConfig> = self
            .configs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        configs.sort_by_key(|config| config.guild_id);

        let yaml = serde_yaml::to_string(&configs)?;
        tokio::fs::write(&self.path, yaml).await?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[async_trait]
impl ConfigStore for GuildConfigStore {
    async fn get(&self, guild_id: GuildId) -> GuildConfig {
        self.configs
            .get(&guild_id)
            .map_or_else(|| GuildConfig::new(guild_id), |entry| entry.value().clone())
    }

    async fn set(&self, guild_id: GuildId, update: ConfigUpdate) -> HoneypotResult<()> {
        self.configs
            .entry(guild_id)
            .or_insert_with(|| GuildConfig::new(guild_id))
            .apply(update);
        self.save().await
    }

    async fn mutate_list(
        &self,
        guild_id: GuildId,
        field: RoleListField,
        op: ListOp,
    ) -> HoneypotResult<ListChange> {
        let change = {
            let mut config = self
                .configs
                .entry(guild_id)
                .or_insert_with(|| GuildConfig::new(guild_id));
            let list = config.list_mut(field);
            match op {
                ListOp::Add(role) => {
                    if list.insert(role) {
                        ListChange::Added
                    } else {
                        ListChange::AlreadyPresent
                    }
                }
                ListOp::Remove(role) => {
                    if list.remove(&role) {
                        ListChange::Removed
                    } else {
                        ListChange::NotPresent
                    }
                }
            }
        };

        if matches!(change, ListChange::Added | ListChange::Removed) {
            self.save().await?;
        }
        Ok(change)
    }
}

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("configs", &self.configs)
            .field("reviews", &self.reviews.len())
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Create a new Data instance with an empty store persisting to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::new(DataInner {
            configs: GuildConfigStore::new(path),
            reviews: ReviewRegistry::new(),
        }))
    }

    /// Load settings from the YAML file at `path`
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        Self(Arc::new(DataInner {
            configs: GuildConfigStore::load(path).await,
            reviews: ReviewRegistry::new(),
        }))
    }
}

/// Shared state: durable guild settings and the in-memory review tokens
pub struct DataInner {
    pub configs: GuildConfigStore,
    pub reviews: ReviewRegistry,
}
