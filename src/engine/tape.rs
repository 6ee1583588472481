//! Rolling tape reader.
//!
//! Collects public trades and top-of-book snapshots into bounded windows and
//! turns them into long/short signals: aggressive-flow imbalance backed by
//! large prints, absorption at the touch, and stop-runs (sweep then reversal).
//! All timestamps are passed in by the caller, the engine never reads a clock.

use std::collections::VecDeque;

use smallvec::SmallVec;
use tracing::{debug, instrument, trace};

use crate::config::TapeSettings;
use crate::engine::cooldown::Cooldown;
use crate::engine::types::{
    Absorption, BookSnapshot, Side, Signal, SignalKind, StopRun, TapeReport, Trade,
};

/// Snapshots needed before a stop-run can be judged
pub const STOPRUN_LOOKBACK: usize = 6;
/// Trailing snapshots inspected for the reversal
const STOPRUN_REVERSAL_SPAN: usize = 4;

#[derive(Debug, Clone)]
pub struct TapeEngine {
    settings: TapeSettings,
    trades: VecDeque<Trade>,
    snapshots: VecDeque<BookSnapshot>,
    cooldown: Cooldown<Side>,
    last_mid: Option<f64>,
}

impl TapeEngine {
    pub fn new(settings: TapeSettings) -> Self {
        let cooldown = Cooldown::new(settings.min_cooldown_ms());
        Self {
            trades: VecDeque::with_capacity(settings.max_trades.min(10_000)),
            snapshots: VecDeque::with_capacity(settings.snapshot_capacity),
            cooldown,
            last_mid: None,
            settings,
        }
    }

    pub fn settings(&self) -> &TapeSettings {
        &self.settings
    }

    pub fn last_mid(&self) -> Option<f64> {
        self.last_mid
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Record a trade and drop everything that fell out of the window.
    pub fn add_trade(&mut self, ts_ms: i64, price: f64, qty: f64, is_buyer_maker: bool) {
        if self.trades.len() >= self.settings.max_trades {
            self.trades.pop_front();
        }
        self.trades.push_back(Trade { ts_ms, price, qty, is_buyer_maker });
        self.prune(ts_ms);
    }

    pub fn add_snapshot(&mut self, ts_ms: i64, bid: f64, ask: f64, bid_size: f64, ask_size: f64) {
        let snapshot = BookSnapshot { ts_ms, bid, ask, bid_size, ask_size };
        if self.snapshots.len() >= self.settings.snapshot_capacity {
            self.snapshots.pop_front();
        }
        self.last_mid = Some(snapshot.mid());
        self.snapshots.push_back(snapshot);
    }

    /// Remove trades older than the window measured back from `now_ms`.
    pub fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.settings.trade_window_ms();
        while let Some(front) = self.trades.front() {
            if front.ts_ms < cutoff {
                self.trades.pop_front();
            } else {
                break;
            }
        }
    }

    /// Share of aggressive-buy notional in the window, 0.5 when there is no flow.
    pub fn calc_imbalance(&self) -> f64 {
        let mut buy_volume = 0.0;
        let mut sell_volume = 0.0;
        for trade in &self.trades {
            if trade.is_aggressive_buy() {
                buy_volume += trade.notional();
            } else {
                sell_volume += trade.notional();
            }
        }
        let total = buy_volume + sell_volume;
        if total == 0.0 {
            return 0.5;
        }
        buy_volume / total
    }

    /// (large_buys, large_sells) by aggressor side
    pub fn detect_large_trades(&self) -> (usize, usize) {
        let threshold = self.settings.large_trade_size;
        self.trades
            .iter()
            .filter(|t| t.qty >= threshold)
            .fold((0, 0), |(buys, sells), t| {
                if t.is_buyer_maker {
                    (buys, sells + 1)
                } else {
                    (buys + 1, sells)
                }
            })
    }

    /// One-sided hitting while the opposite resting size at the touch stays
    /// large relative to what was traded into it.
    #[instrument(level = "trace", skip(self))]
    pub fn detect_absorption(&self) -> Option<Absorption> {
        let latest = self.snapshots.back()?;

        let mut sell_hits = 0usize;
        let mut buy_hits = 0usize;
        let mut sell_qty = 0.0;
        let mut buy_qty = 0.0;
        for trade in &self.trades {
            if trade.is_buyer_maker {
                sell_hits += 1;
                sell_qty += trade.qty;
            } else {
                buy_hits += 1;
                buy_qty += trade.qty;
            }
        }

        let multiplier = self.settings.absorption_multiplier;
        if sell_hits >= 2 && buy_hits <= 1 && latest.bid_size >= sell_qty * multiplier {
            trace!(sell_hits, sell_qty, bid_size = latest.bid_size, "Bid absorbing sellers");
            return Some(Absorption::AbsorbBuy);
        }
        if buy_hits >= 2 && sell_hits <= 1 && latest.ask_size >= buy_qty * multiplier {
            trace!(buy_hits, buy_qty, ask_size = latest.ask_size, "Ask absorbing buyers");
            return Some(Absorption::AbsorbSell);
        }
        None
    }

    /// Fast move of the mid past the threshold that is already retracing.
    #[instrument(level = "trace", skip(self))]
    pub fn detect_stoprun(&self) -> Option<StopRun> {
        let len = self.snapshots.len();
        if len < STOPRUN_LOOKBACK {
            return None;
        }
        let prev_mid = self.snapshots[len - STOPRUN_LOOKBACK].mid();
        let latest_mid = self.snapshots[len - 1].mid();
        if prev_mid <= 0.0 {
            return None;
        }

        let threshold = self.settings.stoprun_price_move;
        let mid_move = (latest_mid - prev_mid) / prev_mid;
        if mid_move.abs() < threshold {
            return None;
        }

        let upward_sweep = mid_move > 0.0;
        for snapshot in self.snapshots.iter().skip(len - STOPRUN_REVERSAL_SPAN) {
            let mid = snapshot.mid();
            if upward_sweep && mid < prev_mid * (1.0 + threshold / 2.0) {
                return Some(StopRun::StopRunShort);
            }
            if !upward_sweep && mid > prev_mid * (1.0 - threshold / 2.0) {
                return Some(StopRun::StopRunLong);
            }
        }
        None
    }

    /// Run every detector and return the signals that pass the per-side cooldown.
    #[instrument(level = "debug", skip(self))]
    pub fn analyze(&mut self, now_ms: i64) -> Vec<Signal> {
        self.prune(now_ms);

        let imbalance = self.calc_imbalance();
        let (large_buys, large_sells) = self.detect_large_trades();
        let threshold = self.settings.imbalance_threshold;

        let mut candidates: SmallVec<[Signal; 6]> = SmallVec::new();
        if imbalance >= threshold && large_buys >= 1 {
            candidates.push(Signal::new(
                Side::Long,
                SignalKind::Imbalance,
                format!("imbalance_buy {imbalance:.2} large_buys={large_buys}"),
            ));
        }
        if imbalance <= 1.0 - threshold && large_sells >= 1 {
            candidates.push(Signal::new(
                Side::Short,
                SignalKind::Imbalance,
                format!("imbalance_sell {imbalance:.2} large_sells={large_sells}"),
            ));
        }
        match self.detect_absorption() {
            Some(Absorption::AbsorbBuy) => candidates.push(Signal::new(
                Side::Long,
                SignalKind::Absorption,
                "absorption_buy_detected",
            )),
            Some(Absorption::AbsorbSell) => candidates.push(Signal::new(
                Side::Short,
                SignalKind::Absorption,
                "absorption_sell_detected",
            )),
            None => {}
        }
        match self.detect_stoprun() {
            Some(StopRun::StopRunLong) => candidates.push(Signal::new(
                Side::Long,
                SignalKind::StopRun,
                "stoprun_long (sweep & reverse)",
            )),
            Some(StopRun::StopRunShort) => candidates.push(Signal::new(
                Side::Short,
                SignalKind::StopRun,
                "stoprun_short (sweep & reverse)",
            )),
            None => {}
        }

        // One signal per side: the latest candidate wins, slot order is first appearance
        let mut per_side: SmallVec<[Signal; 2]> = SmallVec::new();
        for candidate in candidates {
            match per_side.iter_mut().find(|s| s.side == candidate.side) {
                Some(slot) => *slot = candidate,
                None => per_side.push(candidate),
            }
        }

        let out: Vec<Signal> = per_side
            .into_iter()
            .filter(|signal| self.cooldown.try_fire(signal.side, now_ms))
            .collect();

        if !out.is_empty() {
            debug!(signals = out.len(), imbalance, large_buys, large_sells, "Tape signals emitted");
        }
        out
    }

    pub fn report(&self) -> TapeReport {
        let (large_buys, large_sells) = self.detect_large_trades();
        TapeReport {
            trades_in_window: self.trades.len(),
            imbalance: self.calc_imbalance(),
            large_buys,
            large_sells,
        }
    }
}
