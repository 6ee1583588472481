//! Polling monitors: fetch, compute one number, alert past a threshold, sleep.
//!
//! Every monitor runs under [`run_polling`], which owns the
//! catch-log-sleep-retry loop so individual monitors only deal with one poll.

pub mod cvd;
pub mod obi;
pub mod ofi;
pub mod spread;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::market_data::MarketDataError;
use crate::notify::{dispatch, format, Alert, AlertSource, Notifier};

pub use cvd::CvdMonitor;
pub use obi::ObiMonitor;
pub use ofi::OfiMonitor;
pub use spread::SpreadMonitor;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
    #[error("no usable data: {0}")]
    NoData(String),
}

#[async_trait::async_trait]
pub trait Monitor: Send {
    fn name(&self) -> &'static str;

    /// Symbol label used in alerts
    fn label(&self) -> &str;

    /// One fetch/compute step, returns the alerts to deliver.
    async fn poll(&mut self) -> Result<Vec<Alert>, MonitorError>;
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub error_backoff: Duration,
    pub notify_errors: bool,
}

/// Run a monitor forever. Errors are logged, optionally alerted, and retried after a backoff.
pub async fn run_polling<M: Monitor + ?Sized>(
    monitor: &mut M,
    notifier: &dyn Notifier,
    settings: &PollSettings,
) {
    info!(monitor = monitor.name(), interval_ms = settings.interval.as_millis() as u64, "Monitor started");
    loop {
        let delay = match poll_once(monitor, notifier, settings).await {
            Ok(sent) => {
                if sent > 0 {
                    debug!(monitor = monitor.name(), sent, "Alerts dispatched");
                }
                settings.interval
            }
            Err(_) => settings.error_backoff,
        };
        tokio::time::sleep(delay).await;
    }
}

/// A single iteration of the polling loop, returns how many alerts were sent.
pub async fn poll_once<M: Monitor + ?Sized>(
    monitor: &mut M,
    notifier: &dyn Notifier,
    settings: &PollSettings,
) -> Result<usize, MonitorError> {
    metrics::counter!("tapebot_polls_total", "monitor" => monitor.name()).increment(1);
    match monitor.poll().await {
        Ok(alerts) => {
            for alert in &alerts {
                dispatch(notifier, alert).await;
            }
            Ok(alerts.len())
        }
        Err(e) => {
            warn!(monitor = monitor.name(), error = %e, "Poll failed");
            metrics::counter!("tapebot_poll_errors_total", "monitor" => monitor.name()).increment(1);
            if settings.notify_errors {
                let text = format::error(monitor.label(), monitor.name(), &e.to_string());
                dispatch(notifier, &Alert::new(AlertSource::Error, monitor.label(), text)).await;
            }
            Err(e)
        }
    }
}
