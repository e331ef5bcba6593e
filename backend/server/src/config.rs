use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

use crate::cache::SWEEP_INTERVAL;

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bot_token: Option<String>,
    pub oauth: Option<OAuthCredentials>,
    /// Connect the bot on the first API request instead of at startup.
    pub lazy_connect: bool,
    pub production: bool,
    pub static_dir: PathBuf,
    pub upstream_timeout: Duration,
    pub resolve_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            bot_token: None,
            oauth: None,
            lazy_connect: false,
            production: false,
            static_dir: PathBuf::from("public"),
            upstream_timeout: Duration::from_secs(5),
            resolve_timeout: Duration::from_secs(10),
            sweep_interval: SWEEP_INTERVAL,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let bot_token = optional_secret("DISCORD_BOT_TOKEN");
        if bot_token.is_none() {
            warn!("No Discord bot token provided. The application will use simulated data.");
            warn!("Set DISCORD_BOT_TOKEN to enable real Discord data.");
        }

        let oauth = match (
            optional_secret("DISCORD_CLIENT_ID"),
            optional_secret("DISCORD_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(OAuthCredentials {
                client_id,
                client_secret,
                callback_url: try_load(
                    "DISCORD_CALLBACK_URL",
                    "http://localhost:3000/auth/discord/callback",
                )?,
            }),
            _ => {
                info!("DISCORD_CLIENT_ID/DISCORD_CLIENT_SECRET not set, login disabled");
                None
            }
        };

        Ok(Self {
            port: try_load("PORT", "3000")?,
            bot_token,
            oauth,
            lazy_connect: flag("VERCEL"),
            production: var("APP_ENV").is_ok_and(|env| env == "production"),
            static_dir: try_load("STATIC_DIR", "public")?,
            upstream_timeout: try_load_secs("UPSTREAM_TIMEOUT_SECS", "5")?,
            resolve_timeout: try_load_secs("RESOLVE_TIMEOUT_SECS", "10")?,
            sweep_interval: try_load_secs("CACHE_SWEEP_SECS", &SWEEP_INTERVAL.as_secs().to_string())?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        debug!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
        .context("Environment misconfigured!")
}

/// Whole seconds, zero rejected: a zero period panics the sweeper's interval.
fn try_load_secs(key: &str, default: &str) -> anyhow::Result<Duration> {
    match try_load::<u64>(key, default)? {
        0 => Err(anyhow!("Invalid {key} value: must be at least 1")).context("Environment misconfigured!"),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn flag(key: &str) -> bool {
    var(key).is_ok_and(|value| matches!(value.trim(), "1" | "true"))
}

/// Environment first, then a docker secret file of the same name.
fn optional_secret(name: &str) -> Option<String> {
    var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| read_secret(name))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            debug!("No {secret_name} secret file: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}
