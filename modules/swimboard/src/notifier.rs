// Outbound messages: one per new notice, plus heartbeat and error signals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use telegram::{ParseMode, TelegramError, TelegramOptions, TelegramService};
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::parser::ParseAnomaly;
use crate::types::NoticeRecord;

/// Upper bound on error notification length, in characters.
pub const MAX_ERROR_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Html,
    Plain,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, text: &str, format: MessageFormat) -> Result<(), NotifyError>;
}

/// A message with both renderings, so the plain fallback never shows raw tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub html: String,
    pub plain: String,
}

impl Message {
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            html: escape_html(&text),
            plain: text,
        }
    }

    pub fn new_notice(notice: &NoticeRecord, board_label: &str) -> Self {
        let html = format!(
            "🏊‍♀️ <b>{label} 공지 알림</b>\n\n📋 <b>{title}</b>\n📅 등록일: {date}\n🔗 <a href=\"{link}\">공지사항 보기</a>",
            label = escape_html(board_label),
            title = escape_html(&notice.title),
            date = escape_html(&notice.date),
            link = escape_html(&notice.link),
        );
        let plain = format!(
            "🏊‍♀️ {board_label} 공지 알림\n\n📋 {}\n📅 등록일: {}\n🔗 {}",
            notice.title, notice.date, notice.link
        );
        Self { html, plain }
    }

    /// "Nothing new" signal. A parse anomaly is spelled out so an empty
    /// board caused by markup drift or maintenance is visible in the chat.
    pub fn heartbeat(
        board_label: &str,
        checked: usize,
        at: DateTime<FixedOffset>,
        anomaly: Option<ParseAnomaly>,
    ) -> Self {
        let mut text = format!(
            "✅ {board_label} 공지 확인 완료 ({})\n새 공지 없음 (대상 공지 {checked}건)",
            at.format("%Y-%m-%d %H:%M")
        );
        if let Some(anomaly) = anomaly {
            let detail = match anomaly {
                ParseAnomaly::MissingTable => "공지 목록 표를 찾지 못했습니다",
                ParseAnomaly::MissingBody => "공지 목록 표가 비어 있습니다",
            };
            text.push_str(&format!(
                "\n⚠️ {detail} (페이지 구조 변경 또는 점검 중일 수 있음)"
            ));
        }
        Self::plain(text)
    }

    /// Plain-text failure report, truncated to `MAX_ERROR_CHARS`.
    pub fn error(detail: &str) -> Self {
        Self::plain(truncate_chars(
            &format!("❌ 크롤링 오류 발생: {detail}"),
            MAX_ERROR_CHARS,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// Rich formatting was rejected; the plain rendering went out instead.
    Degraded,
    Failed(String),
}

pub struct Notifier {
    sender: Arc<dyn MessageSender>,
    pacing: Duration,
}

impl Notifier {
    pub fn new(sender: Arc<dyn MessageSender>, pacing: Duration) -> Self {
        Self { sender, pacing }
    }

    /// Send `message`. Never fails: HTML that the channel rejects is resent
    /// as plain text once, and anything else is logged and dropped.
    pub async fn notify(&self, message: &Message, format: MessageFormat) -> NotifyOutcome {
        if format == MessageFormat::Html {
            match self.sender.send(&message.html, MessageFormat::Html).await {
                Ok(()) => return NotifyOutcome::Sent,
                Err(NotifyError::Formatting(reason)) => {
                    warn!(%reason, "HTML message rejected, retrying as plain text");
                }
                Err(NotifyError::Transport(reason)) => {
                    warn!(%reason, "Notification send failed");
                    return NotifyOutcome::Failed(reason);
                }
            }
        }

        match self.sender.send(&message.plain, MessageFormat::Plain).await {
            Ok(()) if format == MessageFormat::Html => NotifyOutcome::Degraded,
            Ok(()) => NotifyOutcome::Sent,
            Err(e) => {
                warn!(error = %e, "Plain notification send failed, dropping message");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Gap between consecutive sends to stay under the channel's rate limit.
    pub async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

pub struct TelegramSender {
    service: TelegramService,
    chat_id: String,
}

impl TelegramSender {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, TelegramError> {
        Ok(Self {
            service: TelegramService::new(TelegramOptions::new(bot_token))?,
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, text: &str, format: MessageFormat) -> Result<(), NotifyError> {
        let parse_mode = match format {
            MessageFormat::Html => Some(ParseMode::Html),
            MessageFormat::Plain => None,
        };

        match self.service.send_message(&self.chat_id, text, parse_mode).await {
            Ok(sent) => {
                info!(message_id = sent.message_id, ?format, "Telegram message sent");
                Ok(())
            }
            Err(e) if e.is_parse_error() => Err(NotifyError::Formatting(e.to_string())),
            Err(e) => Err(NotifyError::Transport(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Cut to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
