// Convert wire strings into f64 values and venue-specific symbols.

use std::fmt;

use crate::config::ConfigError;
use crate::engine::types::{DepthLevel, Venue};
use crate::market_data::MarketDataError;

/// Parse an exchange decimal string ("64250.10000000").
pub fn parse_decimal(field: &'static str, s: &str) -> Result<f64, MarketDataError> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| MarketDataError::Number { field, value: s.to_string() })?;
    if !value.is_finite() || value < 0.0 {
        return Err(MarketDataError::Number { field, value: s.to_string() });
    }
    Ok(value)
}

/// `[["price", "size"], ...]` level arrays as Binance/Bybit/OKX publish them
pub fn parse_levels<S: AsRef<str>>(raw: &[Vec<S>]) -> Result<Vec<DepthLevel>, MarketDataError> {
    raw.iter()
        .map(|level| match level.as_slice() {
            [price, size, ..] => Ok(DepthLevel {
                price: parse_decimal("price", price.as_ref())?,
                size: parse_decimal("size", size.as_ref())?,
            }),
            _ => Err(MarketDataError::Malformed("depth level needs price and size".to_string())),
        })
        .collect()
}

/// Trading pair kept as base/quote so each venue can spell it its own way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: &str, quote: &str) -> Self {
        Self { base: base.to_uppercase(), quote: quote.to_uppercase() }
    }

    /// Accepts "BTC/USDT", "BTC-USDT" or "BTC_USDT".
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let mut parts = s.trim().split(|c| c == '/' || c == '-' || c == '_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => Err(ConfigError::Symbol(s.to_string())),
        }
    }

    /// Symbol as the venue's REST API expects it
    pub fn venue_symbol(&self, venue: Venue) -> String {
        match venue {
            Venue::Binance | Venue::Bybit => format!("{}{}", self.base, self.quote),
            Venue::Okx => format!("{}-{}", self.base, self.quote),
        }
    }

    /// Binance stream names are lowercase
    pub fn binance_stream(&self) -> String {
        self.venue_symbol(Venue::Binance).to_lowercase()
    }

    /// Short label used in alerts, e.g. "BTCUSDT"
    pub fn label(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
