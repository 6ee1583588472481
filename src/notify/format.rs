//! Alert message bodies.

use crate::config::TapeSettings;
use crate::engine::cvd::CvdReading;
use crate::engine::obi::OrderBookImbalance;
use crate::engine::spread::CrossSpread;
use crate::engine::types::{Side, Signal, TapeReport};

/// Stop-loss / take-profit around the mid, long below/above and short mirrored.
pub fn suggested_levels(side: Side, mid: f64, stop_loss_pct: f64, take_profit_pct: f64) -> (f64, f64) {
    match side {
        Side::Long => (mid * (1.0 - stop_loss_pct), mid * (1.0 + take_profit_pct)),
        Side::Short => (mid * (1.0 + stop_loss_pct), mid * (1.0 - take_profit_pct)),
    }
}

pub fn tape_signal(
    label: &str,
    signal: &Signal,
    mid: Option<f64>,
    imbalance: f64,
    settings: &TapeSettings,
) -> String {
    let side = signal.side.as_str().to_uppercase();
    match mid {
        Some(mid) => {
            let (sl, tp) =
                suggested_levels(signal.side, mid, settings.stop_loss_pct, settings.take_profit_pct);
            format!(
                "[{label}] {side} signal: {} | mid={mid} | imbalance={imbalance:.2}\nSuggested: SL={sl:.2} TP={tp:.2}",
                signal.detail
            )
        }
        None => format!(
            "[{label}] {side} signal: {} | mid=n/a | imbalance={imbalance:.2}",
            signal.detail
        ),
    }
}

pub fn tape_report(label: &str, report: &TapeReport) -> String {
    format!(
        "[{label}] REPORT: trades_in_window={} imbalance={:.2} large_buys={} large_sells={}",
        report.trades_in_window, report.imbalance, report.large_buys, report.large_sells
    )
}

pub fn obi(
    label: &str,
    obi: &OrderBookImbalance,
    average: f64,
    samples: usize,
    mid: Option<f64>,
) -> String {
    let side = if obi.imbalance() > 0.0 { "BID HEAVY" } else { "ASK HEAVY" };
    let ratio = obi
        .ratio()
        .map(|r| format!("{r:.2}"))
        .unwrap_or_else(|| "inf".to_string());
    let mid = mid.map(|m| format!("{m:.2}")).unwrap_or_else(|| "n/a".to_string());
    format!(
        "[{label}] OBI {side}: imbalance={:+.3} bid/ask={ratio} (top {} levels: bids={:.4} asks={:.4}) avg({samples})={average:+.3} | mid={mid}",
        obi.imbalance(),
        obi.depth,
        obi.bid_volume,
        obi.ask_volume,
    )
}

pub fn cvd(label: &str, reading: &CvdReading, window_secs: f64) -> String {
    let side = if reading.window_delta_quote > 0.0 { "BUYERS" } else { "SELLERS" };
    format!(
        "[{label}] CVD {side} in control: {window_secs:.0}s delta={:+.2} quote ({:+.4} base, {} trades) | session delta={:+.2}",
        reading.window_delta_quote,
        reading.window_delta_base,
        reading.window_trades,
        reading.delta_quote,
    )
}

pub fn ofi(label: &str, rolling: f64, window: usize, cumulative: f64, mid: f64) -> String {
    let side = if rolling > 0.0 { "BUY" } else { "SELL" };
    format!(
        "[{label}] OFI {side} pressure: rolling({window})={rolling:+.4} cumulative={cumulative:+.4} | mid={mid:.2}"
    )
}

pub fn spread(label: &str, spread: &CrossSpread) -> String {
    format!(
        "[{label}] SPREAD {:.2} bps: buy {} @ {} / sell {} @ {} | mid divergence={:.2} bps",
        spread.spread_bps,
        spread.buy_venue,
        spread.buy_ask,
        spread.sell_venue,
        spread.sell_bid,
        spread.mid_divergence_bps,
    )
}

pub fn error(label: &str, monitor: &str, error: &str) -> String {
    format!("[{label}] {monitor} error: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{SignalKind, Venue};

    #[test]
    fn test_suggested_levels() {
        let (sl, tp) = suggested_levels(Side::Long, 100.0, 0.001, 0.003);
        assert!((sl - 99.9).abs() < 1e-9);
        assert!((tp - 100.3).abs() < 1e-9);
        let (sl, tp) = suggested_levels(Side::Short, 100.0, 0.001, 0.003);
        assert!((sl - 100.1).abs() < 1e-9);
        assert!((tp - 99.7).abs() < 1e-9);
    }

    #[test]
    fn test_tape_signal_message() {
        let signal = Signal::new(Side::Long, SignalKind::Absorption, "absorption_buy_detected");
        let text = tape_signal("BTCUSDT", &signal, Some(64000.5), 0.234, &TapeSettings::default());
        assert_eq!(
            text,
            "[BTCUSDT] LONG signal: absorption_buy_detected | mid=64000.5 | imbalance=0.23\nSuggested: SL=63936.50 TP=64192.50"
        );
    }

    #[test]
    fn test_tape_signal_without_mid() {
        let signal = Signal::new(Side::Short, SignalKind::Imbalance, "imbalance_sell 0.10 large_sells=2");
        let text = tape_signal("BTCUSDT", &signal, None, 0.1, &TapeSettings::default());
        assert_eq!(text, "[BTCUSDT] SHORT signal: imbalance_sell 0.10 large_sells=2 | mid=n/a | imbalance=0.10");
    }

    #[test]
    fn test_spread_message() {
        let spread = CrossSpread {
            buy_venue: Venue::Okx,
            buy_ask: 100.0,
            sell_venue: Venue::Bybit,
            sell_bid: 100.3,
            spread_bps: 30.0,
            mid_divergence_bps: 25.0,
        };
        assert_eq!(
            super::spread("BTCUSDT", &spread),
            "[BTCUSDT] SPREAD 30.00 bps: buy okx @ 100 / sell bybit @ 100.3 | mid divergence=25.00 bps"
        );
    }
}
