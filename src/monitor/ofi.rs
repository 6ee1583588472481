use tracing::debug;

use super::{Monitor, MonitorError};
use crate::config::{secs_to_ms, OfiSettings};
use crate::engine::cooldown::Cooldown;
use crate::engine::ofi::OfiTracker;
use crate::engine::types::{Quote, Side};
use crate::market_data::adapters::{BinanceRest, QuoteSource};
use crate::market_data::normaliser::Symbol;
use crate::notify::{format, Alert, AlertSource};

pub struct OfiMonitor {
    symbol: Symbol,
    label: String,
    client: BinanceRest,
    tracker: OfiTracker,
    cooldown: Cooldown<Side>,
    settings: OfiSettings,
}

impl OfiMonitor {
    pub fn new(symbol: Symbol, client: BinanceRest, settings: OfiSettings) -> Self {
        Self {
            label: symbol.label(),
            symbol,
            client,
            tracker: OfiTracker::new(settings.window),
            cooldown: Cooldown::new(secs_to_ms(settings.cooldown_secs)),
            settings,
        }
    }

    pub fn evaluate(&mut self, quote: Quote) -> Option<Alert> {
        let now_ms = quote.ts_ms;
        let mid = quote.mid();
        self.tracker.update(quote)?;

        let rolling = self.tracker.rolling();
        metrics::gauge!("tapebot_ofi_rolling").set(rolling);
        debug!(
            rolling,
            cumulative = self.tracker.cumulative(),
            readings = self.tracker.len(),
            warm = self.tracker.is_warm(),
            "OFI reading"
        );

        if rolling.abs() < self.settings.threshold {
            return None;
        }
        let side = if rolling > 0.0 { Side::Long } else { Side::Short };
        if !self.cooldown.try_fire(side, now_ms) {
            return None;
        }
        let text = format::ofi(&self.label, rolling, self.tracker.len(), self.tracker.cumulative(), mid);
        Some(Alert::new(AlertSource::Ofi, self.label.clone(), text))
    }
}

#[async_trait::async_trait]
impl Monitor for OfiMonitor {
    fn name(&self) -> &'static str {
        "ofi"
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn poll(&mut self) -> Result<Vec<Alert>, MonitorError> {
        let quote = self.client.book_ticker(&self.symbol).await?;
        if !quote.is_two_sided() {
            return Err(MonitorError::NoData("one-sided book ticker".to_string()));
        }
        Ok(self.evaluate(quote).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Venue;

    fn monitor() -> OfiMonitor {
        let client = BinanceRest::new("http://127.0.0.1:9", 1).unwrap();
        let settings = OfiSettings { window: 3, threshold: 5.0, interval_secs: 1.0, cooldown_secs: 10.0 };
        OfiMonitor::new(Symbol::parse("BTC/USDT").unwrap(), client, settings)
    }

    fn quote(ts_ms: i64, bid_size: f64, ask_size: f64) -> Quote {
        Quote { venue: Venue::Binance, ts_ms, bid: 100.0, bid_size, ask: 101.0, ask_size }
    }

    #[test]
    fn test_first_quote_only_primes() {
        let mut monitor = monitor();
        assert!(monitor.evaluate(quote(0, 100.0, 1.0)).is_none());
    }

    #[test]
    fn test_bid_build_up_alerts_buy_pressure() {
        let mut monitor = monitor();
        monitor.evaluate(quote(0, 1.0, 5.0));
        // +3 then +3 => rolling 6
        assert!(monitor.evaluate(quote(1_000, 4.0, 5.0)).is_none());
        let alert = monitor.evaluate(quote(2_000, 7.0, 5.0)).unwrap();
        assert_eq!(alert.source, AlertSource::Ofi);
        assert!(alert.text.starts_with("[BTCUSDT] OFI BUY pressure: rolling(2)=+6.0000"));
        assert!(alert.text.ends_with("mid=100.50"));

        assert!(monitor.evaluate(quote(3_000, 10.0, 5.0)).is_none());
    }

    #[test]
    fn test_ask_build_up_alerts_sell_pressure() {
        let mut monitor = monitor();
        monitor.evaluate(quote(0, 1.0, 1.0));
        let alert = monitor.evaluate(quote(1_000, 1.0, 9.0)).unwrap();
        assert!(alert.text.contains("OFI SELL pressure"));
    }
}
