//! Top-of-book order flow imbalance (Cont, Kukanov & Stoikov).
//!
//! Each quote update contributes
//! `e = bid_term + ask_term` where a bid that moved up adds its full new size,
//! a bid that held adds its size change and a bid that dropped removes its old
//! size. The ask side mirrors that with opposite sign.

use std::collections::VecDeque;

use crate::engine::types::Quote;

/// OFI contribution between two consecutive quotes
pub fn order_flow_imbalance(prev: &Quote, current: &Quote) -> f64 {
    let bid_term = if current.bid > prev.bid {
        current.bid_size
    } else if current.bid == prev.bid {
        current.bid_size - prev.bid_size
    } else {
        -prev.bid_size
    };

    let ask_term = if current.ask < prev.ask {
        -current.ask_size
    } else if current.ask == prev.ask {
        -(current.ask_size - prev.ask_size)
    } else {
        prev.ask_size
    };

    bid_term + ask_term
}

#[derive(Debug)]
pub struct OfiTracker {
    prev: Option<Quote>,
    readings: VecDeque<f64>,
    capacity: usize,
    cumulative: f64,
}

impl OfiTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            prev: None,
            readings: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            cumulative: 0.0,
        }
    }

    /// Feed the next quote, returns the contribution once a previous quote exists.
    pub fn update(&mut self, quote: Quote) -> Option<f64> {
        let ofi = self.prev.as_ref().map(|prev| order_flow_imbalance(prev, &quote));
        if let Some(value) = ofi {
            if self.readings.len() >= self.capacity {
                self.readings.pop_front();
            }
            self.readings.push_back(value);
            self.cumulative += value;
        }
        self.prev = Some(quote);
        ofi
    }

    pub fn rolling(&self) -> f64 {
        self.readings.iter().sum()
    }

    pub fn cumulative(&self) -> f64 {
        self.cumulative
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Window has filled up at least once
    pub fn is_warm(&self) -> bool {
        self.readings.len() >= self.capacity
    }
}
