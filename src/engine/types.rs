use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a trade idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Public trade as printed on the tape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub ts_ms: i64,
    pub price: f64,
    pub qty: f64,
    /// true => buyer was the maker, so the seller was the aggressor
    pub is_buyer_maker: bool,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }

    pub fn is_aggressive_buy(&self) -> bool {
        !self.is_buyer_maker
    }
}

// Top of book at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookSnapshot {
    pub ts_ms: i64,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: f64,
    pub ask_size: f64,
}

impl BookSnapshot {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorption {
    /// Sellers hitting a bid that keeps refilling (bullish)
    AbsorbBuy,
    /// Buyers lifting an ask that keeps refilling (bearish)
    AbsorbSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRun {
    /// Downward sweep that snapped back
    StopRunLong,
    /// Upward sweep that snapped back
    StopRunShort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Imbalance,
    Absorption,
    StopRun,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub side: Side,
    pub kind: SignalKind,
    pub detail: String,
}

impl Signal {
    pub fn new(side: Side, kind: SignalKind, detail: impl Into<String>) -> Self {
        Self { side, kind, detail: detail.into() }
    }
}

/// Periodic summary of the tape window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapeReport {
    pub trades_in_window: usize,
    pub imbalance: f64,
    pub large_buys: usize,
    pub large_sells: usize,
}

/// Exchanges with a public market data adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Bybit,
    Okx,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Bybit => "bybit",
            Venue::Okx => "okx",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Best bid/offer from one venue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub venue: Venue,
    pub ts_ms: i64,
    pub bid: f64,
    pub bid_size: f64,
    pub ask: f64,
    pub ask_size: f64,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Both sides quoted at a positive price
    pub fn is_two_sided(&self) -> bool {
        self.bid > 0.0 && self.ask > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthLevel {
    pub price: f64,
    pub size: f64,
}
