use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;
use crate::filter::FilterMode;
use crate::types::BoardTarget;

const DEFAULT_STATE_PATH: &str = "data/last_posts.json";
const DEFAULT_KEYWORDS: &str = "신규,초급";
const MAX_FETCH_ATTEMPTS: u32 = 10;

/// Run configuration, built once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,

    // Fetching
    pub target: BoardTarget,
    /// Present → fetch through the relay instead of hitting the board directly.
    pub scraper_api_key: Option<String>,
    pub fetch_attempts: u32,
    pub preflight: bool,

    // Pipeline
    pub state_path: PathBuf,
    pub keywords: Vec<String>,
    pub filter_mode: FilterMode,
    pub heartbeat: bool,
    pub pacing: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_bot_token =
            get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let telegram_chat_id =
            get("TELEGRAM_CHAT_ID").ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;

        let filter_mode = match get("SWIMBOARD_FILTER_MODE") {
            Some(raw) => raw.parse::<FilterMode>().map_err(|reason| ConfigError::Invalid {
                var: "SWIMBOARD_FILTER_MODE",
                reason,
            })?,
            None => FilterMode::default(),
        };

        let keywords = parse_keywords(
            &get("SWIMBOARD_KEYWORDS").unwrap_or_else(|| DEFAULT_KEYWORDS.to_string()),
        );
        if keywords.is_empty() && filter_mode != FilterMode::Off {
            return Err(ConfigError::Invalid {
                var: "SWIMBOARD_KEYWORDS",
                reason: "at least one keyword is required unless filtering is off".to_string(),
            });
        }

        let fetch_attempts = match get("SWIMBOARD_FETCH_ATTEMPTS") {
            Some(raw) => {
                let n: u32 = raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SWIMBOARD_FETCH_ATTEMPTS",
                    reason: format!("expected a number, got {raw:?}"),
                })?;
                if !(1..=MAX_FETCH_ATTEMPTS).contains(&n) {
                    return Err(ConfigError::Invalid {
                        var: "SWIMBOARD_FETCH_ATTEMPTS",
                        reason: format!("must be between 1 and {MAX_FETCH_ATTEMPTS}"),
                    });
                }
                n
            }
            None => 3,
        };

        let pacing_ms: u64 = match get("SWIMBOARD_PACING_MS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "SWIMBOARD_PACING_MS",
                reason: format!("expected milliseconds, got {raw:?}"),
            })?,
            None => 1000,
        };

        Ok(Self {
            telegram_bot_token,
            telegram_chat_id,
            target: BoardTarget::wansan(),
            scraper_api_key: get("SCRAPER_API_KEY"),
            fetch_attempts,
            preflight: parse_flag("SWIMBOARD_PREFLIGHT", get("SWIMBOARD_PREFLIGHT"), true)?,
            state_path: PathBuf::from(
                get("SWIMBOARD_STATE_PATH").unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
            ),
            keywords,
            filter_mode,
            heartbeat: parse_flag("SWIMBOARD_HEARTBEAT", get("SWIMBOARD_HEARTBEAT"), true)?,
            pacing: Duration::from_millis(pacing_ms),
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            bot_token = %redact(&self.telegram_bot_token),
            chat_id = %redact(&self.telegram_chat_id),
            relay = self.scraper_api_key.is_some(),
            target = %self.target.full_url(),
            state_path = %self.state_path.display(),
            keywords = ?self.keywords,
            filter_mode = ?self.filter_mode,
            fetch_attempts = self.fetch_attempts,
            preflight = self.preflight,
            heartbeat = self.heartbeat,
            pacing_ms = self.pacing.as_millis() as u64,
            "Configuration loaded"
        );
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("expected true/false, got {raw:?}"),
        }),
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
