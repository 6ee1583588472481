// OKX v5 spot ticker
// Source: https://www.okx.com/docs-v5/en/#order-book-trading-market-data-get-ticker

use serde::Deserialize;

use super::{get_json, http_client, QuoteSource};
use crate::engine::types::{Quote, Venue};
use crate::market_data::normaliser::{parse_decimal, Symbol};
use crate::market_data::{now_ms, MarketDataError};

#[derive(Debug, Deserialize)]
pub struct TickerResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub inst_id: String,
    pub bid_px: String,
    pub bid_sz: String,
    pub ask_px: String,
    pub ask_sz: String,
    #[serde(default)]
    pub ts: String,
}

impl TickerResponse {
    pub fn into_quote(self, fallback_ts_ms: i64) -> Result<Quote, MarketDataError> {
        if self.code != "0" {
            return Err(MarketDataError::Api { venue: Venue::Okx, message: self.msg });
        }
        let ticker = self.data.into_iter().next().ok_or(MarketDataError::EmptyBook(Venue::Okx))?;
        let ts_ms = ticker.ts.parse::<i64>().unwrap_or(fallback_ts_ms);
        Ok(Quote {
            venue: Venue::Okx,
            ts_ms,
            bid: parse_decimal("bidPx", &ticker.bid_px)?,
            bid_size: parse_decimal("bidSz", &ticker.bid_sz)?,
            ask: parse_decimal("askPx", &ticker.ask_px)?,
            ask_size: parse_decimal("askSz", &ticker.ask_sz)?,
        })
    }
}

pub struct OkxRest {
    client: reqwest::Client,
    base_url: String, // "https://www.okx.com"
}

impl OkxRest {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, MarketDataError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl QuoteSource for OkxRest {
    fn venue(&self) -> Venue {
        Venue::Okx
    }

    async fn book_ticker(&self, symbol: &Symbol) -> Result<Quote, MarketDataError> {
        let url = format!("{}/api/v5/market/ticker", self.base_url);
        let query = [("instId", symbol.venue_symbol(Venue::Okx))];
        let response: TickerResponse = get_json(&self.client, Venue::Okx, &url, &query).await?;
        response.into_quote(now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_payload() {
        let raw = r#"{"code":"0","msg":"","data":[{"instType":"SPOT","instId":"BTC-USDT","last":"64000","bidPx":"63999.9","bidSz":"0.5","askPx":"64000","askSz":"2","ts":"1597026383085"}]}"#;
        let quote = serde_json::from_str::<TickerResponse>(raw).unwrap().into_quote(0).unwrap();
        assert_eq!(quote.venue, Venue::Okx);
        assert_eq!(quote.bid, 63999.9);
        assert_eq!(quote.ask, 64000.0);
        assert_eq!(quote.ts_ms, 1597026383085);
    }

    #[test]
    fn test_error_code() {
        let raw = r#"{"code":"51001","msg":"Instrument ID does not exist","data":[]}"#;
        let err = serde_json::from_str::<TickerResponse>(raw).unwrap().into_quote(0).unwrap_err();
        assert!(matches!(err, MarketDataError::Api { venue: Venue::Okx, .. }));
    }
}
