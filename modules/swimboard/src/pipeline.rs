// One watch run: fetch → parse → filter → diff → notify → persist.
//
// State is written last and only after a successful fetch, so a failed run
// leaves the previous snapshot in place and the next run re-detects
// anything this one missed.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::differ::diff;
use crate::error::RunError;
use crate::fetcher::{DirectSource, Fetcher, PageSource, RelaySource, RetryPolicy};
use crate::filter::{select, FilterMode, KeywordFilter};
use crate::notifier::{Message, MessageFormat, Notifier, NotifyOutcome, TelegramSender};
use crate::parser::{parse_report, ParseAnomaly};
use crate::store::StateStore;
use crate::types::{BoardTarget, Snapshot};

const KST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Fetching,
    Parsing,
    Diffing,
    Notifying,
    Persisting,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Rows parsed off the page, before filtering.
    pub parsed: usize,
    /// Notices considered for novelty.
    pub compared: usize,
    pub new_notices: usize,
    pub notified: usize,
    pub degraded: usize,
    pub failed_sends: usize,
    /// Notices written to the snapshot.
    pub persisted: usize,
    pub anomaly: Option<ParseAnomaly>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// The run failed; an error notification was attempted and state was
    /// left untouched.
    Failed(String),
}

pub struct Pipeline {
    target: BoardTarget,
    fetcher: Fetcher,
    notifier: Notifier,
    store: StateStore,
    filter: KeywordFilter,
    filter_mode: FilterMode,
    heartbeat: bool,
}

impl Pipeline {
    pub fn new(target: BoardTarget, fetcher: Fetcher, notifier: Notifier, store: StateStore) -> Self {
        Self {
            target,
            fetcher,
            notifier,
            store,
            filter: KeywordFilter::new(Vec::<String>::new()),
            filter_mode: FilterMode::Off,
            heartbeat: false,
        }
    }

    pub fn with_filter(mut self, mode: FilterMode, filter: KeywordFilter) -> Self {
        self.filter_mode = mode;
        self.filter = filter;
        self
    }

    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    /// Wire up the production collaborators from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source: Arc<dyn PageSource> = match &config.scraper_api_key {
            Some(key) => Arc::new(RelaySource::new(key).context("Failed to build relay client")?),
            None => Arc::new(
                DirectSource::new(config.preflight).context("Failed to build HTTP client")?,
            ),
        };
        let sender = TelegramSender::new(&config.telegram_bot_token, &config.telegram_chat_id)
            .context("Failed to build Telegram client")?;

        let pipeline = Self::new(
            config.target.clone(),
            Fetcher::new(source, RetryPolicy::with_attempts(config.fetch_attempts)),
            Notifier::new(Arc::new(sender), config.pacing),
            StateStore::new(&config.state_path),
        )
        .with_filter(config.filter_mode, KeywordFilter::new(config.keywords.clone()))
        .with_heartbeat(config.heartbeat);

        Ok(pipeline)
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let mut state = RunState::Start;
        let mut report = RunReport::default();

        advance(&mut state, RunState::Fetching);
        let html = match self.fetcher.fetch(&self.target).await {
            Ok(html) => html,
            Err(e) => {
                advance(&mut state, RunState::Failed);
                return Err(e.into());
            }
        };

        advance(&mut state, RunState::Parsing);
        let parsed = parse_report(&html, &self.target.link_base);
        report.parsed = parsed.notices.len();
        report.anomaly = parsed.anomaly;
        if parsed.skipped_rows > 0 {
            info!(skipped = parsed.skipped_rows, "Some rows did not look like notices");
        }
        let selection = select(self.filter_mode, &self.filter, parsed.notices);
        report.compared = selection.compared.len();
        report.persisted = selection.persisted.len();

        advance(&mut state, RunState::Diffing);
        let previous = self.store.load().await;
        let fresh = diff(&selection.compared, previous.notices());
        report.new_notices = fresh.len();
        info!(
            parsed = report.parsed,
            compared = report.compared,
            previous = previous.len(),
            new = fresh.len(),
            "Diff complete"
        );

        advance(&mut state, RunState::Notifying);
        for (i, notice) in fresh.iter().enumerate() {
            if i > 0 {
                self.notifier.pace().await;
            }
            let message = Message::new_notice(notice, &self.target.label);
            match self.notifier.notify(&message, MessageFormat::Html).await {
                NotifyOutcome::Sent => report.notified += 1,
                NotifyOutcome::Degraded => {
                    report.notified += 1;
                    report.degraded += 1;
                }
                NotifyOutcome::Failed(reason) => {
                    warn!(title = notice.title.as_str(), %reason, "Notice notification dropped");
                    report.failed_sends += 1;
                }
            }
        }
        if fresh.is_empty() && self.heartbeat {
            let now = Utc::now().with_timezone(&kst());
            let message =
                Message::heartbeat(&self.target.label, report.compared, now, report.anomaly);
            if let NotifyOutcome::Failed(reason) =
                self.notifier.notify(&message, MessageFormat::Plain).await
            {
                warn!(%reason, "Heartbeat dropped");
            }
        }

        advance(&mut state, RunState::Persisting);
        if let Err(e) = self.store.save(&Snapshot::from(selection.persisted)).await {
            advance(&mut state, RunState::Failed);
            return Err(e.into());
        }

        advance(&mut state, RunState::Done);
        Ok(report)
    }

    /// Run to completion, turning any failure (including a panic inside
    /// the run) into a single plain-text error notification.
    pub async fn run_and_report(self: Arc<Self>) -> RunOutcome {
        let runner = Arc::clone(&self);
        let result = match tokio::spawn(async move { runner.run().await }).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join) => Err(format!("run aborted: {join}")),
        };

        match result {
            Ok(report) => {
                info!(
                    new = report.new_notices,
                    notified = report.notified,
                    persisted = report.persisted,
                    "Run complete"
                );
                RunOutcome::Completed(report)
            }
            Err(reason) => {
                error!(%reason, "Run failed, previous state kept");
                self.notifier
                    .notify(&Message::error(&reason), MessageFormat::Plain)
                    .await;
                RunOutcome::Failed(reason)
            }
        }
    }
}

fn advance(state: &mut RunState, next: RunState) {
    tracing::debug!(from = ?*state, to = ?next, "Run state");
    *state = next;
}

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset is in range")
}
