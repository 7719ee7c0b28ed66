use std::path::PathBuf;

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub data_file: PathBuf,
    /// Fixed service timezone; every reminder window is evaluated in it.
    pub timezone: Tz,
    pub debug: bool,
    pub auth_token: String,
    pub enable_swagger: bool,
    pub port: u16,
    pub discord_api_base: Url,
    pub discord_bot_token: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix. No key
            // separator: APP_DISCORD_BOT_TOKEN must stay the flat key
            // "discord_bot_token", not a nested "discord.bot.token".
            .add_source(Environment::with_prefix("APP"))
            .set_default("data_file", "classes.json")?
            .set_default("timezone", "Asia/Seoul")?
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("discord_api_base", "https://discord.com/api/v10")?
            .set_default("discord_bot_token", "")?
            .build()?;

        config.try_deserialize()
    }
}
