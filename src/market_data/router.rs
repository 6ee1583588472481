// Router wires the feeds, the tape engine and alert delivery together
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::config::{ExchangeSettings, TapeSettings};
use crate::engine::tape::TapeEngine;
use crate::market_data::adapters::BinanceRest;
use crate::market_data::normaliser::Symbol;
use crate::market_data::stream::{Backoff, BinanceStream};
use crate::market_data::{now_ms, MarketDataError, MarketEvent};
use crate::monitor::obi::binance_depth_limit;
use crate::notify::{dispatch, format, Alert, AlertSource, Notifier};

const EVENT_CHANNEL: usize = 4096;
const ALERT_CHANNEL: usize = 256;

/// Feed one normalised event into the engine. Returns false when the event carried nothing usable.
pub fn apply_event(engine: &mut TapeEngine, event: MarketEvent) -> bool {
    match event {
        MarketEvent::Trade { ts_ms, price, qty, is_buyer_maker } => {
            engine.add_trade(ts_ms, price, qty, is_buyer_maker);
            true
        }
        MarketEvent::Quote(quote) => {
            if !quote.is_two_sided() {
                return false;
            }
            engine.add_snapshot(quote.ts_ms, quote.bid, quote.ask, quote.bid_size, quote.ask_size);
            true
        }
        MarketEvent::Depth { ts_ms, bids, asks } => match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => {
                engine.add_snapshot(ts_ms, bid.price, ask.price, bid.size, ask.size);
                true
            }
            _ => false,
        },
    }
}

/// Run the detectors and turn surviving signals into alerts.
pub fn tape_alerts(engine: &mut TapeEngine, label: &str, now_ms: i64) -> Vec<Alert> {
    let signals = engine.analyze(now_ms);
    if signals.is_empty() {
        return Vec::new();
    }
    let imbalance = engine.calc_imbalance();
    let mid = engine.last_mid();
    signals
        .iter()
        .map(|signal| {
            metrics::counter!("tapebot_tape_signals_total", "side" => signal.side.as_str()).increment(1);
            let text = format::tape_signal(label, signal, mid, imbalance, engine.settings());
            Alert::new(AlertSource::Tape, label, text)
        })
        .collect()
}

/// Live tape bot: websocket trades and quotes, polled depth, engine, alerts, periodic report.
/// Only returns when one of its tasks stops.
pub async fn run_tape(
    symbol: Symbol,
    tape: TapeSettings,
    exchanges: &ExchangeSettings,
    notifier: Arc<dyn Notifier>,
) -> Result<(), MarketDataError> {
    let label = symbol.label();
    let engine = Arc::new(Mutex::new(TapeEngine::new(tape.clone())));
    let (event_tx, event_rx) = mpsc::channel::<MarketEvent>(EVENT_CHANNEL);
    let (alert_tx, alert_rx) = mpsc::channel::<Alert>(ALERT_CHANNEL);

    info!(symbol = %symbol, "Starting tape bot");

    // 1. Websocket trades + bookTicker
    let backoff = Backoff::new(
        Duration::from_secs(exchanges.reconnect_min_secs),
        Duration::from_secs(exchanges.reconnect_max_secs),
    );
    let stream = BinanceStream::new(&exchanges.binance_ws, &symbol, backoff);
    let stream_tx = event_tx.clone();
    let mut stream_task = tokio::spawn(async move { stream.run(stream_tx).await });

    // 2. REST depth poller for top-of-book snapshots
    let rest = BinanceRest::new(&exchanges.binance_rest, exchanges.request_timeout_secs)?;
    let depth_limit = binance_depth_limit(tape.depth_limit as usize);
    let depth_every = Duration::from_secs_f64(tape.depth_poll_secs);
    let mut depth_task = tokio::spawn(poll_depth(rest, symbol.clone(), depth_limit, depth_every, event_tx));

    // 3. Engine consumer
    let mut consumer_task =
        tokio::spawn(consume_events(Arc::clone(&engine), label.clone(), event_rx, alert_tx));

    // 4. Alert delivery, off the hot path
    let mut dispatch_task = tokio::spawn(deliver_alerts(notifier, alert_rx));

    // 5. Periodic report
    let report_every = Duration::from_secs(tape.log_every_secs);
    let mut report_task = tokio::spawn(report_loop(engine, label, report_every));

    let result = tokio::select! {
        res = &mut stream_task => finished("websocket", res),
        res = &mut depth_task => finished("depth", res),
        res = &mut consumer_task => finished("engine", res),
        res = &mut dispatch_task => finished("dispatch", res),
        res = &mut report_task => finished("report", res),
    };
    for task in [&stream_task, &depth_task, &consumer_task, &dispatch_task, &report_task] {
        task.abort();
    }
    result
}

async fn poll_depth(
    rest: BinanceRest,
    symbol: Symbol,
    limit: u32,
    every: Duration,
    tx: mpsc::Sender<MarketEvent>,
) -> Result<(), MarketDataError> {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match rest.depth(&symbol, limit).await {
            Ok((bids, asks)) => {
                let event = MarketEvent::Depth { ts_ms: now_ms(), bids, asks };
                tx.send(event).await.map_err(|_| MarketDataError::ChannelClosed)?;
            }
            Err(e) => {
                warn!(error = %e, "Depth poll failed");
                metrics::counter!("tapebot_depth_poll_errors_total").increment(1);
            }
        }
    }
}

async fn consume_events(
    engine: Arc<Mutex<TapeEngine>>,
    label: String,
    mut rx: mpsc::Receiver<MarketEvent>,
    alert_tx: mpsc::Sender<Alert>,
) -> Result<(), MarketDataError> {
    while let Some(event) = rx.recv().await {
        let alerts = {
            let mut engine = engine.lock();
            if !apply_event(&mut engine, event) {
                continue;
            }
            tape_alerts(&mut engine, &label, now_ms())
        };
        for alert in alerts {
            alert_tx.send(alert).await.map_err(|_| MarketDataError::ChannelClosed)?;
        }
    }
    Err(MarketDataError::ChannelClosed)
}

async fn deliver_alerts(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::Receiver<Alert>,
) -> Result<(), MarketDataError> {
    while let Some(alert) = rx.recv().await {
        dispatch(notifier.as_ref(), &alert).await;
    }
    Err(MarketDataError::ChannelClosed)
}

async fn report_loop(
    engine: Arc<Mutex<TapeEngine>>,
    label: String,
    every: Duration,
) -> Result<(), MarketDataError> {
    let mut ticker = tokio::time::interval(every);
    // first tick fires immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let (report, trades, snapshots) = {
            let engine = engine.lock();
            (engine.report(), engine.trade_count(), engine.snapshot_count())
        };
        metrics::gauge!("tapebot_tape_imbalance").set(report.imbalance);
        debug!(trades, snapshots, "Tape buffers");
        info!("{}", format::tape_report(&label, &report));
    }
}

fn finished(
    task: &'static str,
    res: Result<Result<(), MarketDataError>, JoinError>,
) -> Result<(), MarketDataError> {
    match res {
        Ok(Ok(())) => warn!(task, "Task completed"),
        Ok(Err(e)) => error!(task, error = %e, "Task failed"),
        Err(e) => error!(task, error = %e, "Task panicked or was cancelled"),
    }
    Err(MarketDataError::TaskStopped(task))
}
