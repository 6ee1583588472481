// Source: https://developers.binance.com/docs/binance-spot-api-docs (REST + websocket streams)

use serde::Deserialize;

use crate::engine::types::{DepthLevel, Quote, Trade, Venue};
use crate::market_data::normaliser::{parse_decimal, parse_levels};
use crate::market_data::MarketDataError;

// GET /api/v3/ticker/bookTicker
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    pub bid_price: String,
    pub bid_qty: String,
    pub ask_price: String,
    pub ask_qty: String,
}

impl BookTicker {
    pub fn into_quote(self, ts_ms: i64) -> Result<Quote, MarketDataError> {
        Ok(Quote {
            venue: Venue::Binance,
            ts_ms,
            bid: parse_decimal("bidPrice", &self.bid_price)?,
            bid_size: parse_decimal("bidQty", &self.bid_qty)?,
            ask: parse_decimal("askPrice", &self.ask_price)?,
            ask_size: parse_decimal("askQty", &self.ask_qty)?,
        })
    }
}

// GET /api/v3/depth
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depth {
    pub last_update_id: u64,
    pub bids: Vec<Vec<String>>, // [price, qty]
    pub asks: Vec<Vec<String>>,
}

impl Depth {
    pub fn levels(&self) -> Result<(Vec<DepthLevel>, Vec<DepthLevel>), MarketDataError> {
        Ok((parse_levels(&self.bids)?, parse_levels(&self.asks)?))
    }
}

// GET /api/v3/trades
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestTrade {
    pub id: u64,
    pub price: String,
    pub qty: String,
    pub time: i64,
    pub is_buyer_maker: bool,
}

impl RestTrade {
    pub fn to_trade(&self) -> Result<(u64, Trade), MarketDataError> {
        Ok((
            self.id,
            Trade {
                ts_ms: self.time,
                price: parse_decimal("price", &self.price)?,
                qty: parse_decimal("qty", &self.qty)?,
                is_buyer_maker: self.is_buyer_maker,
            },
        ))
    }
}

// Combined stream wrapper: {"stream": "btcusdt@trade", "data": {...}}
#[derive(Debug, Deserialize)]
pub struct CombinedFrame {
    pub stream: String,
    pub data: serde_json::Value,
}

// <symbol>@trade
#[derive(Debug, Deserialize)]
pub struct WsTrade {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub qty: String,
    #[serde(rename = "T")]
    pub trade_time: i64,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

// <symbol>@bookTicker, carries no event type or timestamp on spot
#[derive(Debug, Deserialize)]
pub struct WsBookTicker {
    #[serde(rename = "u")]
    pub update_id: u64,
    #[serde(rename = "b")]
    pub bid_price: String,
    #[serde(rename = "B")]
    pub bid_qty: String,
    #[serde(rename = "a")]
    pub ask_price: String,
    #[serde(rename = "A")]
    pub ask_qty: String,
}

impl WsBookTicker {
    pub fn into_quote(self, ts_ms: i64) -> Result<Quote, MarketDataError> {
        Ok(Quote {
            venue: Venue::Binance,
            ts_ms,
            bid: parse_decimal("b", &self.bid_price)?,
            bid_size: parse_decimal("B", &self.bid_qty)?,
            ask: parse_decimal("a", &self.ask_price)?,
            ask_size: parse_decimal("A", &self.ask_qty)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_ticker_payload() {
        let raw = r#"{"symbol":"BTCUSDT","bidPrice":"64000.01000000","bidQty":"1.50000000","askPrice":"64000.02000000","askQty":"0.25000000"}"#;
        let quote = serde_json::from_str::<BookTicker>(raw).unwrap().into_quote(7).unwrap();
        assert_eq!(quote.bid, 64000.01);
        assert_eq!(quote.bid_size, 1.5);
        assert_eq!(quote.ask_size, 0.25);
        assert_eq!(quote.ts_ms, 7);
    }

    #[test]
    fn test_depth_payload() {
        let raw = r#"{"lastUpdateId":1027024,"bids":[["4.00000000","431.00000000"]],"asks":[["4.00000200","12.00000000"],["4.00000300","1.00000000"]]}"#;
        let depth: Depth = serde_json::from_str(raw).unwrap();
        let (bids, asks) = depth.levels().unwrap();
        assert_eq!(bids, vec![DepthLevel { price: 4.0, size: 431.0 }]);
        assert_eq!(asks.len(), 2);
    }

    #[test]
    fn test_rest_trades_payload() {
        let raw = r#"[{"id":28457,"price":"4.00000100","qty":"12.00000000","quoteQty":"48.000012","time":1499865549590,"isBuyerMaker":true,"isBestMatch":true}]"#;
        let trades: Vec<RestTrade> = serde_json::from_str(raw).unwrap();
        let (id, trade) = trades[0].to_trade().unwrap();
        assert_eq!(id, 28457);
        assert_eq!(trade.qty, 12.0);
        assert!(trade.is_buyer_maker);
    }
}
