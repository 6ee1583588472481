// Market data module entrypoint
pub mod adapters;       // venue-specific REST fetchers (Binance, Bybit, OKX)
pub mod normaliser;     // converts wire strings -> f64 and venue symbols
pub mod depth_book;     // in-memory representation of a REST depth snapshot
pub mod stream;         // Binance combined trade/bookTicker websocket
pub mod router;         // orchestrates the tape bot tasks

use thiserror::Error;

use crate::engine::types::{DepthLevel, Quote, Venue};

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{venue} returned {status}: {body}")]
    Status { venue: Venue, status: u16, body: String },
    #[error("{venue} api error: {message}")]
    Api { venue: Venue, message: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid number in {field}: {value:?}")]
    Number { field: &'static str, value: String },
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("{0} returned an empty book")]
    EmptyBook(Venue),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("event channel closed")]
    ChannelClosed,
    #[error("{0} task stopped")]
    TaskStopped(&'static str),
}

/// Normalised events flowing from the feeds into the tape engine
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    Trade {
        ts_ms: i64,
        price: f64,
        qty: f64,
        is_buyer_maker: bool,
    },
    /// Top of book from the bookTicker stream
    Quote(Quote),
    /// Top levels from a REST depth poll
    Depth {
        ts_ms: i64,
        bids: Vec<DepthLevel>,
        asks: Vec<DepthLevel>,
    },
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
