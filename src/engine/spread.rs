use crate::engine::types::{Quote, Venue};

/// Best cross-venue pairing: buy where the ask is lowest, sell where the bid is highest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSpread {
    pub buy_venue: Venue,
    pub buy_ask: f64,
    pub sell_venue: Venue,
    pub sell_bid: f64,
    /// (sell_bid - buy_ask) / buy_ask in basis points, positive when crossed
    pub spread_bps: f64,
    /// Gap between the highest and lowest venue mid, in basis points of the lowest
    pub mid_divergence_bps: f64,
}

pub fn cross_spread(quotes: &[Quote]) -> Option<CrossSpread> {
    let usable: Vec<&Quote> = quotes.iter().filter(|q| q.is_two_sided()).collect();
    if usable.len() < 2 {
        return None;
    }

    let best_bid = usable.iter().copied().max_by(|a, b| a.bid.total_cmp(&b.bid))?;
    let best_ask = usable.iter().copied().min_by(|a, b| a.ask.total_cmp(&b.ask))?;

    // Same venue on both legs: take the best pairing that spans two venues
    let (buy, sell) = if best_bid.venue == best_ask.venue {
        let alt_bid = usable
            .iter()
            .copied()
            .filter(|q| q.venue != best_ask.venue)
            .max_by(|a, b| a.bid.total_cmp(&b.bid))?;
        let alt_ask = usable
            .iter()
            .copied()
            .filter(|q| q.venue != best_bid.venue)
            .min_by(|a, b| a.ask.total_cmp(&b.ask))?;
        if alt_bid.bid - best_ask.ask >= best_bid.bid - alt_ask.ask {
            (best_ask, alt_bid)
        } else {
            (alt_ask, best_bid)
        }
    } else {
        (best_ask, best_bid)
    };

    let max_mid = usable.iter().map(|q| q.mid()).fold(f64::MIN, f64::max);
    let min_mid = usable.iter().map(|q| q.mid()).fold(f64::MAX, f64::min);

    Some(CrossSpread {
        buy_venue: buy.venue,
        buy_ask: buy.ask,
        sell_venue: sell.venue,
        sell_bid: sell.bid,
        spread_bps: (sell.bid - buy.ask) / buy.ask * 10_000.0,
        mid_divergence_bps: (max_mid - min_mid) / min_mid * 10_000.0,
    })
}
