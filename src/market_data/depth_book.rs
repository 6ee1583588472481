use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::engine::types::DepthLevel;

// Depth book holds the latest REST depth snapshot, price -> size
#[derive(Debug, Default, Clone)]
pub struct DepthBook {
    pub bids: BTreeMap<OrderedFloat<f64>, f64>, // highest price = best bid
    pub asks: BTreeMap<OrderedFloat<f64>, f64>, // lowest price  = best ask
    pub ts_ms: i64,
}

impl DepthBook {
    pub fn new() -> Self {
        Self::default()
    }

    // Replace the whole book with a fresh snapshot, zero-size levels are dropped
    pub fn apply_snapshot(&mut self, ts_ms: i64, bids: &[DepthLevel], asks: &[DepthLevel]) {
        self.bids.clear();
        self.asks.clear();
        self.ts_ms = ts_ms;

        for level in bids.iter().filter(|l| l.size > 0.0) {
            self.bids.insert(OrderedFloat(level.price), level.size);
        }
        for level in asks.iter().filter(|l| l.size > 0.0) {
            self.asks.insert(OrderedFloat(level.price), level.size);
        }
    }

    pub fn bbo(&self) -> (Option<DepthLevel>, Option<DepthLevel>) {
        let best_bid = self
            .bids
            .iter()
            .next_back()
            .map(|(p, s)| DepthLevel { price: p.into_inner(), size: *s });
        let best_ask = self
            .asks
            .iter()
            .next()
            .map(|(p, s)| DepthLevel { price: p.into_inner(), size: *s });
        (best_bid, best_ask)
    }

    /// Best-first levels on each side
    pub fn top_n(&self, n: usize) -> (Vec<DepthLevel>, Vec<DepthLevel>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(n)
            .map(|(p, s)| DepthLevel { price: p.into_inner(), size: *s })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(n)
            .map(|(p, s)| DepthLevel { price: p.into_inner(), size: *s })
            .collect();
        (bids, asks)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
