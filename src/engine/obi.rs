use std::collections::VecDeque;

use crate::engine::types::DepthLevel;

/// Resting liquidity on each side of the top `depth` levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBookImbalance {
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub depth: usize,
}

impl OrderBookImbalance {
    /// Levels are expected best-first, as exchanges publish them.
    pub fn from_levels(bids: &[DepthLevel], asks: &[DepthLevel], depth: usize) -> Self {
        let bid_volume = bids.iter().take(depth).map(|l| l.size).sum();
        let ask_volume = asks.iter().take(depth).map(|l| l.size).sum();
        Self { bid_volume, ask_volume, depth }
    }

    /// bid / ask resting size
    pub fn ratio(&self) -> Option<f64> {
        if self.ask_volume > 0.0 {
            Some(self.bid_volume / self.ask_volume)
        } else {
            None
        }
    }

    /// (bid - ask) / (bid + ask), in [-1, 1]
    pub fn imbalance(&self) -> f64 {
        let total = self.bid_volume + self.ask_volume;
        if total > 0.0 {
            (self.bid_volume - self.ask_volume) / total
        } else {
            0.0
        }
    }

}

/// Last `capacity` imbalance readings, oldest first.
#[derive(Debug, Clone)]
pub struct ImbalanceHistory {
    readings: VecDeque<f64>,
    capacity: usize,
}

impl ImbalanceHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { readings: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, imbalance: f64) {
        if self.readings.len() >= self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(imbalance);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Mean of the kept readings, 0 when empty
    pub fn average(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        self.readings.iter().sum::<f64>() / self.readings.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn levels(sizes: &[f64]) -> Vec<DepthLevel> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| DepthLevel { price: 100.0 - i as f64, size: *size })
            .collect()
    }

    #[test]
    fn test_depth_limits_levels() {
        let obi = OrderBookImbalance::from_levels(&levels(&[1.0, 2.0, 100.0]), &levels(&[1.0, 1.0]), 2);
        assert_eq!(obi.bid_volume, 3.0);
        assert_eq!(obi.ask_volume, 2.0);
        assert_eq!(obi.ratio(), Some(1.5));
        assert!((obi.imbalance() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_book() {
        let obi = OrderBookImbalance::from_levels(&[], &[], 10);
        assert_eq!(obi.ratio(), None);
        assert_eq!(obi.imbalance(), 0.0);
    }

    #[test]
    fn test_one_sided_book() {
        let obi = OrderBookImbalance::from_levels(&levels(&[5.0]), &[], 10);
        assert_eq!(obi.ratio(), None);
        assert_eq!(obi.imbalance(), 1.0);
    }

    #[test]
    fn test_history_average_over_last_readings() {
        let mut history = ImbalanceHistory::new(3);
        assert!(history.is_empty());
        assert_eq!(history.average(), 0.0);
        for reading in [0.9, 0.3, -0.3, 0.6] {
            history.push(reading);
        }
        // 0.9 dropped
        assert_eq!(history.len(), 3);
        assert!((history.average() - 0.2).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn imbalance_is_bounded(
            bids in proptest::collection::vec(0.0f64..1e6, 0..50),
            asks in proptest::collection::vec(0.0f64..1e6, 0..50),
            depth in 1usize..60,
        ) {
            let obi = OrderBookImbalance::from_levels(&levels(&bids), &levels(&asks), depth);
            let imbalance = obi.imbalance();
            prop_assert!((-1.0..=1.0).contains(&imbalance));
        }

        #[test]
        fn history_never_exceeds_capacity(
            readings in proptest::collection::vec(-1.0f64..=1.0, 0..200),
            capacity in 1usize..40,
        ) {
            let mut history = ImbalanceHistory::new(capacity);
            for reading in &readings {
                history.push(*reading);
                prop_assert!(history.len() <= capacity);
                prop_assert!((-1.0..=1.0).contains(&history.average()));
            }
            prop_assert_eq!(history.len(), readings.len().min(capacity));
        }
    }
}
