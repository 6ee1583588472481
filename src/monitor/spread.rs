use futures::future::join_all;
use tracing::{debug, warn};

use super::{Monitor, MonitorError};
use crate::config::{secs_to_ms, SpreadSettings};
use crate::engine::cooldown::Cooldown;
use crate::engine::spread::cross_spread;
use crate::engine::types::{Quote, Venue};
use crate::market_data::adapters::QuoteSource;
use crate::market_data::normaliser::Symbol;
use crate::market_data::now_ms;
use crate::notify::{format, Alert, AlertSource};

pub struct SpreadMonitor {
    symbol: Symbol,
    label: String,
    sources: Vec<Box<dyn QuoteSource>>,
    /// Keyed by (buy venue, sell venue)
    cooldown: Cooldown<(Venue, Venue)>,
    settings: SpreadSettings,
}

impl SpreadMonitor {
    pub fn new(symbol: Symbol, sources: Vec<Box<dyn QuoteSource>>, settings: SpreadSettings) -> Self {
        Self {
            label: symbol.label(),
            symbol,
            sources,
            cooldown: Cooldown::new(secs_to_ms(settings.cooldown_secs)),
            settings,
        }
    }

    pub fn evaluate(&mut self, now_ms: i64, quotes: &[Quote]) -> Result<Option<Alert>, MonitorError> {
        let Some(spread) = cross_spread(quotes) else {
            return Err(MonitorError::NoData(format!(
                "need two-sided quotes from at least 2 venues, got {}",
                quotes.len()
            )));
        };
        metrics::gauge!("tapebot_cross_spread_bps").set(spread.spread_bps);
        debug!(
            buy = %spread.buy_venue,
            sell = %spread.sell_venue,
            spread_bps = spread.spread_bps,
            divergence_bps = spread.mid_divergence_bps,
            "Spread reading"
        );

        if spread.spread_bps < self.settings.threshold_bps {
            return Ok(None);
        }
        if !self.cooldown.try_fire((spread.buy_venue, spread.sell_venue), now_ms) {
            return Ok(None);
        }
        Ok(Some(Alert::new(AlertSource::Spread, self.label.clone(), format::spread(&self.label, &spread))))
    }

    async fn fetch_quotes(&self) -> Vec<Quote> {
        let requests = self.sources.iter().map(|source| source.book_ticker(&self.symbol));
        let results = join_all(requests).await;

        let mut quotes = Vec::with_capacity(results.len());
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    warn!(venue = %source.venue(), error = %e, "Quote fetch failed, skipping venue");
                    metrics::counter!("tapebot_venue_errors_total", "venue" => source.venue().as_str())
                        .increment(1);
                }
            }
        }
        quotes
    }
}

#[async_trait::async_trait]
impl Monitor for SpreadMonitor {
    fn name(&self) -> &'static str {
        "spread"
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn poll(&mut self) -> Result<Vec<Alert>, MonitorError> {
        let quotes = self.fetch_quotes().await;
        Ok(self.evaluate(now_ms(), &quotes)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::MarketDataError;

    struct Fixed {
        venue: Venue,
        quote: Option<(f64, f64)>,
    }

    #[async_trait::async_trait]
    impl QuoteSource for Fixed {
        fn venue(&self) -> Venue {
            self.venue
        }

        async fn book_ticker(&self, _symbol: &Symbol) -> Result<Quote, MarketDataError> {
            match self.quote {
                Some((bid, ask)) => {
                    Ok(Quote { venue: self.venue, ts_ms: 0, bid, bid_size: 1.0, ask, ask_size: 1.0 })
                }
                None => Err(MarketDataError::EmptyBook(self.venue)),
            }
        }
    }

    fn monitor(sources: Vec<Box<dyn QuoteSource>>) -> SpreadMonitor {
        let settings = SpreadSettings {
            venues: vec![Venue::Binance, Venue::Bybit, Venue::Okx],
            threshold_bps: 5.0,
            interval_secs: 1.0,
            cooldown_secs: 60.0,
        };
        SpreadMonitor::new(Symbol::parse("BTC/USDT").unwrap(), sources, settings)
    }

    fn source(venue: Venue, quote: Option<(f64, f64)>) -> Box<dyn QuoteSource> {
        Box::new(Fixed { venue, quote })
    }

    #[tokio::test]
    async fn test_failed_venue_is_skipped() {
        let mut monitor = monitor(vec![
            source(Venue::Binance, Some((100.0, 100.01))),
            source(Venue::Bybit, None),
            source(Venue::Okx, Some((100.2, 100.21))),
        ]);
        let alerts = monitor.poll().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text.starts_with("[BTCUSDT] SPREAD 19.00 bps: buy binance @ 100.01 / sell okx @ 100.2"));
    }

    #[tokio::test]
    async fn test_single_venue_is_an_error() {
        let mut monitor = monitor(vec![
            source(Venue::Binance, Some((100.0, 100.01))),
            source(Venue::Bybit, None),
        ]);
        assert!(matches!(monitor.poll().await, Err(MonitorError::NoData(_))));
    }

    #[test]
    fn test_cooldown_is_per_venue_pair() {
        let mut monitor = monitor(Vec::new());
        let q = |venue, bid, ask| Quote { venue, ts_ms: 0, bid, bid_size: 1.0, ask, ask_size: 1.0 };
        let a = [q(Venue::Binance, 100.0, 100.01), q(Venue::Okx, 100.2, 100.21)];
        let b = [q(Venue::Binance, 100.2, 100.21), q(Venue::Okx, 100.0, 100.01)];

        assert!(monitor.evaluate(0, &a).unwrap().is_some());
        assert!(monitor.evaluate(1_000, &a).unwrap().is_none());
        // reversed direction is a different pair
        assert!(monitor.evaluate(2_000, &b).unwrap().is_some());
    }

    #[test]
    fn test_below_threshold_is_quiet() {
        let mut monitor = monitor(Vec::new());
        let q = |venue, bid, ask| Quote { venue, ts_ms: 0, bid, bid_size: 1.0, ask, ask_size: 1.0 };
        let quotes = [q(Venue::Binance, 100.0, 100.01), q(Venue::Bybit, 100.0, 100.01)];
        assert!(monitor.evaluate(0, &quotes).unwrap().is_none());
    }
}
