use tracing::debug;

use super::{Monitor, MonitorError};
use crate::config::{secs_to_ms, CvdSettings};
use crate::engine::cooldown::Cooldown;
use crate::engine::cvd::CumulativeVolumeDelta;
use crate::engine::types::{Side, Trade};
use crate::market_data::adapters::BinanceRest;
use crate::market_data::normaliser::Symbol;
use crate::market_data::now_ms;
use crate::notify::{format, Alert, AlertSource};

pub struct CvdMonitor {
    symbol: Symbol,
    label: String,
    client: BinanceRest,
    cvd: CumulativeVolumeDelta,
    cooldown: Cooldown<Side>,
    /// Smallest seen (local - trade time), i.e. how far our clock runs ahead of the exchange
    clock_offset_ms: Option<i64>,
    settings: CvdSettings,
}

impl CvdMonitor {
    pub fn new(symbol: Symbol, client: BinanceRest, settings: CvdSettings) -> Self {
        Self {
            label: symbol.label(),
            symbol,
            client,
            cvd: CumulativeVolumeDelta::new(secs_to_ms(settings.window_secs)),
            cooldown: Cooldown::new(secs_to_ms(settings.cooldown_secs)),
            clock_offset_ms: None,
            settings,
        }
    }

    /// `local_ms` is our clock at fetch time. The window is measured on the
    /// exchange clock the trade timestamps come from.
    pub fn evaluate(&mut self, local_ms: i64, trades: &[(u64, Trade)]) -> Option<Alert> {
        let now_ms = self.exchange_now(local_ms, trades);
        let applied = self.cvd.apply_batch(trades.iter().map(|(id, trade)| (*id, trade)));
        let reading = self.cvd.reading(now_ms);
        metrics::gauge!("tapebot_cvd_window_quote").set(reading.window_delta_quote);
        debug!(applied, window_delta = reading.window_delta_quote, total = reading.delta_quote, "CVD reading");

        if reading.window_delta_quote.abs() < self.settings.threshold_quote {
            return None;
        }
        let side = if reading.window_delta_quote > 0.0 { Side::Long } else { Side::Short };
        if !self.cooldown.try_fire(side, now_ms) {
            return None;
        }
        let text = format::cvd(&self.label, &reading, self.settings.window_secs);
        Some(Alert::new(AlertSource::Cvd, self.label.clone(), text))
    }

    fn exchange_now(&mut self, local_ms: i64, trades: &[(u64, Trade)]) -> i64 {
        if let Some(latest) = trades.iter().map(|(_, trade)| trade.ts_ms).max() {
            let gap = local_ms - latest;
            self.clock_offset_ms = Some(self.clock_offset_ms.map_or(gap, |offset| offset.min(gap)));
        }
        local_ms - self.clock_offset_ms.unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Monitor for CvdMonitor {
    fn name(&self) -> &'static str {
        "cvd"
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn poll(&mut self) -> Result<Vec<Alert>, MonitorError> {
        let trades = self.client.recent_trades(&self.symbol, self.settings.trades_limit).await?;
        Ok(self.evaluate(now_ms(), &trades).into_iter().collect())
    }
}
