// Binance combined stream: <symbol>@trade + <symbol>@bookTicker

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::adapters::binance_types::{CombinedFrame, WsBookTicker, WsTrade};
use super::normaliser::{parse_decimal, Symbol};
use super::{now_ms, MarketDataError, MarketEvent};

/// Exponential reconnect delay, doubled after every failure and capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max, current: min }
    }

    /// Delay to wait now, the following call returns twice as much
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

pub fn combined_stream_url(ws_base: &str, symbol: &Symbol) -> String {
    let stream = symbol.binance_stream();
    format!("{ws_base}{stream}@trade/{stream}@bookTicker")
}

/// Decode one text frame. `Ok(None)` for frames that carry nothing we use.
/// Every event is stamped with `received_ms`.
pub fn decode_frame(text: &str, received_ms: i64) -> Result<Option<MarketEvent>, MarketDataError> {
    let frame: CombinedFrame = serde_json::from_str(text)?;
    if frame.stream.ends_with("@trade") {
        let trade: WsTrade = serde_json::from_value(frame.data)?;
        if trade.event_type != "trade" {
            return Ok(None);
        }
        // engine windows run on the local clock, exchange time only feeds the lag metric
        metrics::histogram!("tapebot_trade_lag_ms").record((received_ms - trade.trade_time) as f64);
        return Ok(Some(MarketEvent::Trade {
            ts_ms: received_ms,
            price: parse_decimal("p", &trade.price)?,
            qty: parse_decimal("q", &trade.qty)?,
            is_buyer_maker: trade.is_buyer_maker,
        }));
    }
    if frame.stream.ends_with("@bookTicker") {
        let ticker: WsBookTicker = serde_json::from_value(frame.data)?;
        return Ok(Some(MarketEvent::Quote(ticker.into_quote(received_ms)?)));
    }
    Ok(None)
}

pub struct BinanceStream {
    url: String,
    backoff: Backoff,
}

impl BinanceStream {
    pub fn new(ws_base: &str, symbol: &Symbol, backoff: Backoff) -> Self {
        Self { url: combined_stream_url(ws_base, symbol), backoff }
    }

    /// Stream forever, reconnecting with backoff. Returns once the receiver is gone.
    pub async fn run(mut self, tx: mpsc::Sender<MarketEvent>) -> Result<(), MarketDataError> {
        loop {
            match self.session(&tx).await {
                Err(MarketDataError::ChannelClosed) => return Err(MarketDataError::ChannelClosed),
                Err(e) => warn!(error = %e, "Websocket session failed"),
                Ok(()) => warn!("Websocket closed by server"),
            }
            metrics::counter!("tapebot_ws_reconnects_total").increment(1);
            let delay = self.backoff.next_delay();
            info!(delay_secs = delay.as_secs(), "Reconnecting websocket");
            tokio::time::sleep(delay).await;
        }
    }

    async fn session(&mut self, tx: &mpsc::Sender<MarketEvent>) -> Result<(), MarketDataError> {
        info!(url = %self.url, "Connecting to websocket");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        info!("Connected to websocket");
        self.backoff.reset();

        let (_write, mut read) = ws_stream.split();
        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => match decode_frame(&text, now_ms()) {
                    Ok(Some(event)) => {
                        metrics::counter!("tapebot_ws_events_total").increment(1);
                        tx.send(event).await.map_err(|_| MarketDataError::ChannelClosed)?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        // skip the frame, keep the session
                        debug!(error = %e, "Undecodable frame");
                        metrics::counter!("tapebot_ws_decode_errors_total").increment(1);
                    }
                },
                Message::Close(frame) => {
                    debug!(?frame, "Close frame received");
                    break;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_stream_url() {
        let symbol = Symbol::parse("BTC/USDT").unwrap();
        assert_eq!(
            combined_stream_url("wss://stream.binance.com:9443/stream?streams=", &symbol),
            "wss://stream.binance.com:9443/stream?streams=btcusdt@trade/btcusdt@bookTicker"
        );
    }

    #[test]
    fn test_decode_trade_frame() {
        let raw = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1672515782136,"s":"BTCUSDT","t":12345,"p":"64000.10","q":"0.75","T":1672515782134,"m":true,"M":true}}"#;
        let event = decode_frame(raw, 1672515782200).unwrap();
        assert_eq!(
            event,
            Some(MarketEvent::Trade { ts_ms: 1672515782200, price: 64000.1, qty: 0.75, is_buyer_maker: true })
        );
    }

    #[test]
    fn test_trade_uses_receive_time_not_exchange_time() {
        // exchange clock 5s behind ours
        let raw = r#"{"stream":"btcusdt@trade","data":{"e":"trade","t":7,"p":"1","q":"1","T":995000,"m":false}}"#;
        match decode_frame(raw, 1_000_000).unwrap() {
            Some(MarketEvent::Trade { ts_ms, .. }) => assert_eq!(ts_ms, 1_000_000),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_decode_book_ticker_frame() {
        let raw = r#"{"stream":"btcusdt@bookTicker","data":{"u":400900217,"s":"BTCUSDT","b":"64000.00","B":"3.5","a":"64000.01","A":"0.4"}}"#;
        match decode_frame(raw, 42).unwrap() {
            Some(MarketEvent::Quote(quote)) => {
                assert_eq!(quote.ts_ms, 42);
                assert_eq!(quote.bid_size, 3.5);
                assert_eq!(quote.ask, 64000.01);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_and_bad_frames() {
        let raw = r#"{"stream":"btcusdt@kline_1m","data":{}}"#;
        assert_eq!(decode_frame(raw, 0).unwrap(), None);
        assert!(decode_frame("not json", 0).is_err());
        let raw = r#"{"stream":"btcusdt@trade","data":{"e":"trade","t":1,"p":"x","q":"1","T":1,"m":false}}"#;
        assert!(decode_frame(raw, 0).is_err());
    }
}
