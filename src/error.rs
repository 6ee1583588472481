use thiserror::Error;

use crate::config::ConfigError;
use crate::market_data::MarketDataError;
use crate::monitor::MonitorError;
use crate::notify::NotifyError;

/// Top-level error for library callers that drive more than one layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("market data: {0}")]
    MarketData(#[from] MarketDataError),
    #[error("notify: {0}")]
    Notify(#[from] NotifyError),
    #[error("monitor: {0}")]
    Monitor(#[from] MonitorError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
