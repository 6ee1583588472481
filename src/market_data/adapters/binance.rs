// Binance spot public REST endpoints

use tracing::instrument;

use super::binance_types::{BookTicker, Depth, RestTrade};
use super::{get_json, http_client, QuoteSource};
use crate::engine::types::{DepthLevel, Quote, Trade, Venue};
use crate::market_data::normaliser::Symbol;
use crate::market_data::{now_ms, MarketDataError};

pub struct BinanceRest {
    client: reqwest::Client,
    base_url: String, // "https://api.binance.com"
}

impl BinanceRest {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, MarketDataError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET /api/v3/depth, levels best-first
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn depth(
        &self,
        symbol: &Symbol,
        limit: u32,
    ) -> Result<(Vec<DepthLevel>, Vec<DepthLevel>), MarketDataError> {
        let url = format!("{}/api/v3/depth", self.base_url);
        let query = [
            ("symbol", symbol.venue_symbol(Venue::Binance)),
            ("limit", limit.to_string()),
        ];
        let depth: Depth = get_json(&self.client, Venue::Binance, &url, &query).await?;
        depth.levels()
    }

    /// GET /api/v3/trades, most recent `limit` trades keyed by trade id
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn recent_trades(
        &self,
        symbol: &Symbol,
        limit: u32,
    ) -> Result<Vec<(u64, Trade)>, MarketDataError> {
        let url = format!("{}/api/v3/trades", self.base_url);
        let query = [
            ("symbol", symbol.venue_symbol(Venue::Binance)),
            ("limit", limit.to_string()),
        ];
        let trades: Vec<RestTrade> = get_json(&self.client, Venue::Binance, &url, &query).await?;
        trades.iter().map(RestTrade::to_trade).collect()
    }
}

#[async_trait::async_trait]
impl QuoteSource for BinanceRest {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn book_ticker(&self, symbol: &Symbol) -> Result<Quote, MarketDataError> {
        let url = format!("{}/api/v3/ticker/bookTicker", self.base_url);
        let query = [("symbol", symbol.venue_symbol(Venue::Binance))];
        let ticker: BookTicker = get_json(&self.client, Venue::Binance, &url, &query).await?;
        ticker.into_quote(now_ms())
    }
}
