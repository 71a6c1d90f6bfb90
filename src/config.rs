use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;
use crate::tracking::StreamSettings;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub api_base: String,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub telegram: TelegramConfig,
    pub notification_queue_size: usize,
    pub streams: StreamSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let poll_secs: u64 = parse_or_default("STREAM_POLL_INTERVAL_SECS", 5)?;
        let lifetime_secs: u64 = parse_or_default("STREAM_MAX_LIFETIME_SECS", 300)?;
        if poll_secs == 0 || lifetime_secs == 0 {
            return Err(AppError::Internal(
                "stream poll interval and lifetime must be > 0".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            static_dir: PathBuf::from(
                env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
            ),
            telegram: TelegramConfig {
                bot_token: optional("TELEGRAM_BOT_TOKEN"),
                channel_id: optional("TELEGRAM_CHANNEL_ID"),
                api_base: optional("TELEGRAM_API_BASE")
                    .unwrap_or_else(|| "https://api.telegram.org".to_string()),
                webhook_url: optional("TELEGRAM_WEBHOOK_URL"),
            },
            notification_queue_size: parse_or_default("NOTIFICATION_QUEUE_SIZE", 1024)?,
            streams: StreamSettings {
                poll_interval: Duration::from_secs(poll_secs),
                max_lifetime: Duration::from_secs(lifetime_secs),
                ..StreamSettings::default()
            },
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
