//! Cumulative volume delta over a trade feed.
//!
//! Keeps lifetime totals of signed base and quote volume (aggressive buys
//! positive) plus a time-bounded delta used for alerting. REST trade polls
//! overlap, so trades carry the exchange trade id and anything at or below the
//! last applied id is skipped.

use std::collections::VecDeque;

use crate::engine::types::Trade;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvdReading {
    pub delta_base: f64,
    pub delta_quote: f64,
    pub window_delta_base: f64,
    pub window_delta_quote: f64,
    pub window_trades: usize,
}

#[derive(Debug)]
pub struct CumulativeVolumeDelta {
    window_ms: i64,
    delta_base: f64,
    delta_quote: f64,
    // (ts_ms, signed base, signed quote)
    window: VecDeque<(i64, f64, f64)>,
    last_trade_id: Option<u64>,
}

impl CumulativeVolumeDelta {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            delta_base: 0.0,
            delta_quote: 0.0,
            window: VecDeque::new(),
            last_trade_id: None,
        }
    }

    pub fn last_trade_id(&self) -> Option<u64> {
        self.last_trade_id
    }

    /// Apply one trade. Returns false when the id was already seen.
    pub fn apply(&mut self, trade_id: u64, trade: &Trade) -> bool {
        if matches!(self.last_trade_id, Some(last) if trade_id <= last) {
            return false;
        }
        self.last_trade_id = Some(trade_id);

        let signed_base = if trade.is_aggressive_buy() { trade.qty } else { -trade.qty };
        let signed_quote = signed_base * trade.price;
        self.delta_base += signed_base;
        self.delta_quote += signed_quote;
        self.window.push_back((trade.ts_ms, signed_base, signed_quote));
        true
    }

    /// Apply a batch in id order, returns how many were new.
    pub fn apply_batch<'a, I>(&mut self, trades: I) -> usize
    where
        I: IntoIterator<Item = (u64, &'a Trade)>,
    {
        let mut batch: Vec<(u64, &Trade)> = trades.into_iter().collect();
        batch.sort_by_key(|(id, _)| *id);
        batch.into_iter().filter(|(id, trade)| self.apply(*id, trade)).count()
    }

    pub fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.window_ms;
        while let Some((ts, _, _)) = self.window.front() {
            if *ts < cutoff {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn reading(&mut self, now_ms: i64) -> CvdReading {
        self.prune(now_ms);
        let (window_delta_base, window_delta_quote) = self
            .window
            .iter()
            .fold((0.0, 0.0), |(b, q), (_, sb, sq)| (b + sb, q + sq));
        CvdReading {
            delta_base: self.delta_base,
            delta_quote: self.delta_quote,
            window_delta_base,
            window_delta_quote,
            window_trades: self.window.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(ts_ms: i64, price: f64, qty: f64, is_buyer_maker: bool) -> Trade {
        Trade { ts_ms, price, qty, is_buyer_maker }
    }

    #[test]
    fn test_signed_totals() {
        let mut cvd = CumulativeVolumeDelta::new(60_000);
        assert!(cvd.apply(1, &trade(0, 100.0, 2.0, false)));
        assert!(cvd.apply(2, &trade(1, 110.0, 1.0, true)));
        let reading = cvd.reading(2);
        assert_eq!(reading.delta_base, 1.0);
        assert_eq!(reading.delta_quote, 90.0);
        assert_eq!(reading.window_trades, 2);
    }

    #[test]
    fn test_duplicate_ids_are_skipped() {
        let mut cvd = CumulativeVolumeDelta::new(60_000);
        let t = trade(0, 100.0, 1.0, false);
        let applied = cvd.apply_batch(vec![(3, &t), (1, &t), (2, &t)]);
        assert_eq!(applied, 3);
        let applied = cvd.apply_batch(vec![(2, &t), (3, &t), (4, &t)]);
        assert_eq!(applied, 1);
        assert_eq!(cvd.last_trade_id(), Some(4));
        assert_eq!(cvd.reading(0).delta_base, 4.0);
    }

    #[test]
    fn test_window_forgets_but_totals_do_not() {
        let mut cvd = CumulativeVolumeDelta::new(1_000);
        cvd.apply(1, &trade(0, 100.0, 1.0, false));
        cvd.apply(2, &trade(1_500, 100.0, 1.0, true));
        let reading = cvd.reading(2_000);
        assert_eq!(reading.window_trades, 1);
        assert_eq!(reading.window_delta_quote, -100.0);
        assert_eq!(reading.delta_quote, 0.0);
    }
}
