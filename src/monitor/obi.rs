use tracing::debug;

use super::{Monitor, MonitorError};
use crate::config::{secs_to_ms, ObiSettings};
use crate::engine::cooldown::Cooldown;
use crate::engine::obi::{ImbalanceHistory, OrderBookImbalance};
use crate::engine::types::{DepthLevel, Side};
use crate::market_data::adapters::BinanceRest;
use crate::market_data::depth_book::DepthBook;
use crate::market_data::normaliser::Symbol;
use crate::market_data::now_ms;
use crate::notify::{format, Alert, AlertSource};

/// Limits accepted by Binance /api/v3/depth
const DEPTH_LIMITS: [u32; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];

pub fn binance_depth_limit(depth: usize) -> u32 {
    DEPTH_LIMITS
        .iter()
        .copied()
        .find(|limit| *limit as usize >= depth)
        .unwrap_or(5000)
}

pub struct ObiMonitor {
    symbol: Symbol,
    label: String,
    client: BinanceRest,
    book: DepthBook,
    history: ImbalanceHistory,
    cooldown: Cooldown<Side>,
    settings: ObiSettings,
}

impl ObiMonitor {
    pub fn new(symbol: Symbol, client: BinanceRest, settings: ObiSettings) -> Self {
        Self {
            label: symbol.label(),
            symbol,
            client,
            book: DepthBook::new(),
            history: ImbalanceHistory::new(settings.history),
            cooldown: Cooldown::new(secs_to_ms(settings.cooldown_secs)),
            settings,
        }
    }

    /// Apply a depth snapshot and decide whether it is worth an alert.
    pub fn evaluate(
        &mut self,
        now_ms: i64,
        bids: &[DepthLevel],
        asks: &[DepthLevel],
    ) -> Result<Option<Alert>, MonitorError> {
        self.book.apply_snapshot(now_ms, bids, asks);
        if self.book.is_empty() {
            return Err(MonitorError::NoData("empty depth snapshot".to_string()));
        }

        let (top_bids, top_asks) = self.book.top_n(self.settings.depth);
        let obi = OrderBookImbalance::from_levels(&top_bids, &top_asks, self.settings.depth);
        let imbalance = obi.imbalance();
        self.history.push(imbalance);
        let average = self.history.average();
        metrics::gauge!("tapebot_obi_imbalance").set(imbalance);
        debug!(imbalance, average, bid_volume = obi.bid_volume, ask_volume = obi.ask_volume, "OBI reading");

        let side = if imbalance >= self.settings.threshold {
            Side::Long
        } else if imbalance <= -self.settings.threshold {
            Side::Short
        } else {
            return Ok(None);
        };
        if !self.cooldown.try_fire(side, now_ms) {
            return Ok(None);
        }

        let mid = match self.book.bbo() {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        };
        let text = format::obi(&self.label, &obi, average, self.history.len(), mid);
        Ok(Some(Alert::new(AlertSource::Obi, self.label.clone(), text)))
    }
}

#[async_trait::async_trait]
impl Monitor for ObiMonitor {
    fn name(&self) -> &'static str {
        "obi"
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn poll(&mut self) -> Result<Vec<Alert>, MonitorError> {
        let limit = binance_depth_limit(self.settings.depth);
        let (bids, asks) = self.client.depth(&self.symbol, limit).await?;
        Ok(self.evaluate(now_ms(), &bids, &asks)?.into_iter().collect())
    }
}
