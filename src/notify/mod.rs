// Alert delivery: Telegram in production, log output for dry runs

pub mod format;
pub mod telegram;

use std::fmt;

use thiserror::Error;
use tracing::info;

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Which detector produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSource {
    Tape,
    Obi,
    Cvd,
    Ofi,
    Spread,
    Error,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::Tape => "tape",
            AlertSource::Obi => "obi",
            AlertSource::Cvd => "cvd",
            AlertSource::Ofi => "ofi",
            AlertSource::Spread => "spread",
            AlertSource::Error => "error",
        }
    }
}

impl fmt::Display for AlertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub source: AlertSource,
    pub symbol: String,
    pub text: String,
}

impl Alert {
    pub fn new(source: AlertSource, symbol: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source, symbol: symbol.into(), text: text.into() }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Logs alerts instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        info!(source = %alert.source, symbol = %alert.symbol, "[DRY-RUN] alert:\n{}", alert.text);
        Ok(())
    }
}

/// Send and log the outcome; delivery failures never stop the caller.
pub async fn dispatch(notifier: &dyn Notifier, alert: &Alert) {
    match notifier.send(alert).await {
        Ok(()) => {
            metrics::counter!("tapebot_alerts_sent_total", "source" => alert.source.as_str()).increment(1);
        }
        Err(e) => {
            tracing::warn!(source = %alert.source, error = %e, "Alert delivery failed");
            metrics::counter!("tapebot_alerts_failed_total", "source" => alert.source.as_str()).increment(1);
        }
    }
}
