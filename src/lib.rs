pub mod commands;
pub mod data;
pub mod discord;
pub mod handlers;
pub mod honeypot;
pub mod logging;
pub mod settings;

pub const BOT_NAME: &str = "honeypot_warden";
pub const COMMAND_TARGET: &str = "honeypot_warden::command";
pub const ERROR_TARGET: &str = "honeypot_warden::error";
pub const EVENT_TARGET: &str = "honeypot_warden::handlers";
pub const MODERATION_TARGET: &str = "honeypot_warden::moderation";
pub const CONSOLE_TARGET: &str = "honeypot_warden";

pub use data::{Data, DataInner, GuildConfig, GuildConfigStore, PunishmentAction};
pub use settings::Settings;
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
