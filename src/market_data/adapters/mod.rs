// Shared trait + HTTP plumbing for exchange adapters

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ExchangeSettings;
use crate::engine::types::{Quote, Venue};
use crate::market_data::normaliser::Symbol;
use crate::market_data::MarketDataError;

pub mod binance;
pub mod binance_types;
pub mod bybit;
pub mod okx;

pub use binance::BinanceRest;
pub use bybit::BybitRest;
pub use okx::OkxRest;

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    fn venue(&self) -> Venue;

    /// Best bid/offer with sizes
    async fn book_ticker(&self, symbol: &Symbol) -> Result<Quote, MarketDataError>;
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, MarketDataError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// GET and decode JSON, non-2xx responses become `MarketDataError::Status`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    venue: Venue,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, MarketDataError> {
    debug!(%venue, url, "GET");
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(%venue, status = status.as_u16(), "Request failed");
        metrics::counter!("tapebot_http_errors_total", "venue" => venue.as_str()).increment(1);
        return Err(MarketDataError::Status { venue, status: status.as_u16(), body });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Build the REST client for one venue
pub fn quote_source(
    venue: Venue,
    settings: &ExchangeSettings,
) -> Result<Box<dyn QuoteSource>, MarketDataError> {
    let timeout = settings.request_timeout_secs;
    Ok(match venue {
        Venue::Binance => Box::new(BinanceRest::new(&settings.binance_rest, timeout)?),
        Venue::Bybit => Box::new(BybitRest::new(&settings.bybit_rest, timeout)?),
        Venue::Okx => Box::new(OkxRest::new(&settings.okx_rest, timeout)?),
    })
}
