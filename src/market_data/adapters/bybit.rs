// Bybit v5 spot ticker
// Source: https://bybit-exchange.github.io/docs/v5/market/tickers

use serde::Deserialize;

use super::{get_json, http_client, QuoteSource};
use crate::engine::types::{Quote, Venue};
use crate::market_data::normaliser::{parse_decimal, Symbol};
use crate::market_data::{now_ms, MarketDataError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickersResponse {
    pub ret_code: i64,
    pub ret_msg: String,
    pub result: Option<TickersResult>,
    #[serde(default)]
    pub time: i64,
}

#[derive(Debug, Deserialize)]
pub struct TickersResult {
    #[serde(default)]
    pub list: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    #[serde(rename = "bid1Price")]
    pub bid1_price: String,
    #[serde(rename = "bid1Size")]
    pub bid1_size: String,
    #[serde(rename = "ask1Price")]
    pub ask1_price: String,
    #[serde(rename = "ask1Size")]
    pub ask1_size: String,
}

impl TickersResponse {
    pub fn into_quote(self, fallback_ts_ms: i64) -> Result<Quote, MarketDataError> {
        if self.ret_code != 0 {
            return Err(MarketDataError::Api { venue: Venue::Bybit, message: self.ret_msg });
        }
        let ticker = self
            .result
            .and_then(|r| r.list.into_iter().next())
            .ok_or(MarketDataError::EmptyBook(Venue::Bybit))?;
        let ts_ms = if self.time > 0 { self.time } else { fallback_ts_ms };
        Ok(Quote {
            venue: Venue::Bybit,
            ts_ms,
            bid: parse_decimal("bid1Price", &ticker.bid1_price)?,
            bid_size: parse_decimal("bid1Size", &ticker.bid1_size)?,
            ask: parse_decimal("ask1Price", &ticker.ask1_price)?,
            ask_size: parse_decimal("ask1Size", &ticker.ask1_size)?,
        })
    }
}

pub struct BybitRest {
    client: reqwest::Client,
    base_url: String, // "https://api.bybit.com"
}

impl BybitRest {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, MarketDataError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl QuoteSource for BybitRest {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    async fn book_ticker(&self, symbol: &Symbol) -> Result<Quote, MarketDataError> {
        let url = format!("{}/v5/market/tickers", self.base_url);
        let query = [
            ("category", "spot".to_string()),
            ("symbol", symbol.venue_symbol(Venue::Bybit)),
        ];
        let response: TickersResponse = get_json(&self.client, Venue::Bybit, &url, &query).await?;
        response.into_quote(now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_payload() {
        let raw = r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"BTCUSDT","bid1Price":"64000.1","bid1Size":"0.8","ask1Price":"64000.2","ask1Size":"1.2","lastPrice":"64000.1"}]},"time":1673859087947}"#;
        let quote = serde_json::from_str::<TickersResponse>(raw).unwrap().into_quote(0).unwrap();
        assert_eq!(quote.venue, Venue::Bybit);
        assert_eq!(quote.bid, 64000.1);
        assert_eq!(quote.ask_size, 1.2);
        assert_eq!(quote.ts_ms, 1673859087947);
    }

    #[test]
    fn test_api_error_and_empty_list() {
        let raw = r#"{"retCode":10001,"retMsg":"params error","result":{},"time":1}"#;
        let err = serde_json::from_str::<TickersResponse>(raw).unwrap().into_quote(0).unwrap_err();
        assert!(matches!(err, MarketDataError::Api { venue: Venue::Bybit, .. }));

        let raw = r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[]},"time":1}"#;
        let err = serde_json::from_str::<TickersResponse>(raw).unwrap().into_quote(0).unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyBook(Venue::Bybit)));
    }
}
