// Minimal Telegram Bot API client: just what a notifier needs.

use std::time::Duration;

pub mod models;
use reqwest::Client;
use thiserror::Error;

pub use crate::models::{ApiResponse, ParseMode, SendMessageRequest, SentMessage};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub type Result<T> = std::result::Result<T, TelegramError>;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Telegram API error (status {status}): {description}")]
    Api { status: u16, description: String },

    #[error("Malformed Telegram response: {0}")]
    Decode(String),
}

impl TelegramError {
    /// True when Telegram rejected the message body itself (bad HTML or
    /// Markdown entities), as opposed to auth, rate limit or network trouble.
    pub fn is_parse_error(&self) -> bool {
        match self {
            TelegramError::Api {
                status,
                description,
            } => *status == 400 && is_entity_complaint(description),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        TelegramError::Network(err.to_string())
    }
}

fn is_entity_complaint(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("can't parse entities")
        || lower.contains("unsupported start tag")
        || lower.contains("can't find end tag")
}

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub bot_token: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramOptions {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramService {
    options: TelegramOptions,
    client: Client,
}

impl TelegramService {
    pub fn new(options: TelegramOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { options, client })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.options.api_base.trim_end_matches('/'),
            self.options.bot_token,
            method
        )
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<SentMessage> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        let envelope: ApiResponse<SentMessage> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Api {
                    status: status.as_u16(),
                    description: raw,
                })
            }
            Err(e) => return Err(TelegramError::Decode(e.to_string())),
        };

        if !status.is_success() || !envelope.ok {
            return Err(TelegramError::Api {
                status: envelope.error_code.unwrap_or(status.as_u16()),
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Decode("ok response without result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, description: &str) -> TelegramError {
        TelegramError::Api {
            status,
            description: description.to_string(),
        }
    }

    #[test]
    fn test_is_parse_error() {
        assert!(api_error(
            400,
            "Bad Request: can't parse entities: Unsupported start tag \"x\" at byte offset 3"
        )
        .is_parse_error());
        assert!(api_error(400, "Bad Request: can't find end tag corresponding to start tag b")
            .is_parse_error());

        assert!(!api_error(400, "Bad Request: chat not found").is_parse_error());
        assert!(!api_error(401, "Unauthorized").is_parse_error());
        assert!(!api_error(429, "Too Many Requests: retry after 5").is_parse_error());
        assert!(!TelegramError::Network("connection reset".into()).is_parse_error());
    }

    #[test]
    fn test_method_url() {
        let mut options = TelegramOptions::new("123:abc");
        options.api_base = "http://localhost:8081/".to_string();
        let service = TelegramService::new(options).unwrap();

        assert_eq!(
            service.method_url("sendMessage"),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_plain_request_omits_parse_mode() {
        let body = SendMessageRequest {
            chat_id: "42",
            text: "hello",
            parse_mode: None,
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("parse_mode").is_none());

        let body = SendMessageRequest {
            parse_mode: Some(ParseMode::Html),
            ..body
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["parse_mode"], "HTML");
    }

    #[test]
    fn test_error_envelope_deserializes() {
        let raw = r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities"}"#;
        let envelope: ApiResponse<SentMessage> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.ok);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error_code, Some(400));
    }
}
