pub mod config;
pub mod differ;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod notifier;
pub mod parser;
pub mod pipeline;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;

pub use config::Config;
pub use error::{
    AttemptFailure, ConfigError, FetchAttempt, FetchError, NotifyError, PersistError, RunError,
};
pub use pipeline::{Pipeline, RunOutcome, RunReport, RunState};
pub use types::{BoardTarget, NoticeRecord, Snapshot};
