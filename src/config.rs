// Runtime settings: defaults -> optional TOML file -> TAPEBOT_* environment
// (sections nest with `__`, e.g. TAPEBOT_TELEGRAM__TOKEN).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::types::Venue;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid symbol {0:?}, expected BASE/QUOTE")]
    Symbol(String),
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// BASE/QUOTE, e.g. "BTC/USDT"
    pub symbol: String,
    /// Log alerts instead of sending them
    pub dry_run: bool,
    /// Send an alert when a polling loop errors out
    pub notify_errors: bool,
    pub error_backoff_secs: f64,
    pub metrics_addr: String,

    pub telegram: TelegramSettings,
    pub exchanges: ExchangeSettings,
    pub tape: TapeSettings,
    pub obi: ObiSettings,
    pub cvd: CvdSettings,
    pub ofi: OfiSettings,
    pub spread: SpreadSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            dry_run: false,
            notify_errors: false,
            error_backoff_secs: 5.0,
            metrics_addr: "0.0.0.0:9000".to_string(),
            telegram: TelegramSettings::default(),
            exchanges: ExchangeSettings::default(),
            tape: TapeSettings::default(),
            obi: ObiSettings::default(),
            cvd: CvdSettings::default(),
            ofi: OfiSettings::default(),
            spread: SpreadSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub binance_rest: String,
    pub binance_ws: String,
    pub bybit_rest: String,
    pub okx_rest: String,
    pub request_timeout_secs: u64,
    /// Websocket reconnect backoff, doubles from min up to max
    pub reconnect_min_secs: u64,
    pub reconnect_max_secs: u64,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            binance_rest: "https://api.binance.com".to_string(),
            binance_ws: "wss://stream.binance.com:9443/stream?streams=".to_string(),
            bybit_rest: "https://api.bybit.com".to_string(),
            okx_rest: "https://www.okx.com".to_string(),
            request_timeout_secs: 5,
            reconnect_min_secs: 1,
            reconnect_max_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeSettings {
    pub trade_window_secs: f64,          // rolling window for tape analysis
    pub imbalance_threshold: f64,        // aggressive buy share (0..1) for momentum
    pub large_trade_size: f64,           // base asset qty counted as a large print
    pub absorption_multiplier: f64,      // resting size vs traded size for absorption
    pub stoprun_price_move: f64,         // 0.003 = 0.3% sweep
    pub min_cooldown_secs: f64,          // between signals on the same side
    pub snapshot_capacity: usize,
    pub max_trades: usize,
    pub depth_poll_secs: f64,
    pub depth_limit: u32,
    pub log_every_secs: u64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for TapeSettings {
    fn default() -> Self {
        Self {
            trade_window_secs: 3.0,
            imbalance_threshold: 0.7,
            large_trade_size: 0.5,
            absorption_multiplier: 8.0,
            stoprun_price_move: 0.003,
            min_cooldown_secs: 5.0,
            snapshot_capacity: 50,
            max_trades: 100_000,
            depth_poll_secs: 1.0,
            depth_limit: 5,
            log_every_secs: 60,
            stop_loss_pct: 0.001,
            take_profit_pct: 0.003,
        }
    }
}

impl TapeSettings {
    pub fn trade_window_ms(&self) -> i64 {
        secs_to_ms(self.trade_window_secs)
    }

    pub fn min_cooldown_ms(&self) -> i64 {
        secs_to_ms(self.min_cooldown_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObiSettings {
    pub depth: usize,
    /// |imbalance| in (0, 1]
    pub threshold: f64,
    /// Readings averaged in the alert
    pub history: usize,
    pub interval_secs: f64,
    pub cooldown_secs: f64,
}

impl Default for ObiSettings {
    fn default() -> Self {
        Self { depth: 20, threshold: 0.3, history: 12, interval_secs: 5.0, cooldown_secs: 60.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvdSettings {
    pub window_secs: f64,
    /// Window delta in quote currency
    pub threshold_quote: f64,
    pub trades_limit: u32,
    pub interval_secs: f64,
    pub cooldown_secs: f64,
}

impl Default for CvdSettings {
    fn default() -> Self {
        Self {
            window_secs: 60.0,
            threshold_quote: 250_000.0,
            trades_limit: 1000,
            interval_secs: 2.0,
            cooldown_secs: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfiSettings {
    /// Readings summed for the rolling OFI
    pub window: usize,
    /// Rolling OFI in base asset units
    pub threshold: f64,
    pub interval_secs: f64,
    pub cooldown_secs: f64,
}

impl Default for OfiSettings {
    fn default() -> Self {
        Self { window: 20, threshold: 5.0, interval_secs: 1.0, cooldown_secs: 60.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadSettings {
    pub venues: Vec<Venue>,
    pub threshold_bps: f64,
    pub interval_secs: f64,
    pub cooldown_secs: f64,
}

impl Default for SpreadSettings {
    fn default() -> Self {
        Self {
            venues: vec![Venue::Binance, Venue::Bybit, Venue::Okx],
            threshold_bps: 5.0,
            interval_secs: 5.0,
            cooldown_secs: 60.0,
        }
    }
}

/// Largest `limit` accepted by Binance /api/v3/trades
pub const MAX_BINANCE_TRADES: u32 = 1000;

pub fn secs_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

impl Settings {
    /// Layer an optional file and the environment over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(config::File::with_name("tapebot").required(false));
            }
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TAPEBOT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("spread.venues")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        info!(symbol = %settings.symbol, dry_run = settings.dry_run, "Configuration loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("error_backoff_secs", self.error_backoff_secs),
            ("tape.trade_window_secs", self.tape.trade_window_secs),
            ("tape.large_trade_size", self.tape.large_trade_size),
            ("tape.absorption_multiplier", self.tape.absorption_multiplier),
            ("tape.stoprun_price_move", self.tape.stoprun_price_move),
            ("tape.depth_poll_secs", self.tape.depth_poll_secs),
            ("obi.interval_secs", self.obi.interval_secs),
            ("cvd.window_secs", self.cvd.window_secs),
            ("cvd.threshold_quote", self.cvd.threshold_quote),
            ("cvd.interval_secs", self.cvd.interval_secs),
            ("ofi.threshold", self.ofi.threshold),
            ("ofi.interval_secs", self.ofi.interval_secs),
            ("spread.interval_secs", self.spread.interval_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Validation(format!("{name} must be > 0, got {value}")));
            }
        }

        let cooldowns = [
            ("tape.min_cooldown_secs", self.tape.min_cooldown_secs),
            ("obi.cooldown_secs", self.obi.cooldown_secs),
            ("cvd.cooldown_secs", self.cvd.cooldown_secs),
            ("ofi.cooldown_secs", self.ofi.cooldown_secs),
            ("spread.cooldown_secs", self.spread.cooldown_secs),
        ];
        for (name, value) in cooldowns {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Validation(format!("{name} must be >= 0, got {value}")));
            }
        }

        let whole_secs = [
            ("tape.log_every_secs", self.tape.log_every_secs),
            ("telegram.timeout_secs", self.telegram.timeout_secs),
            ("exchanges.request_timeout_secs", self.exchanges.request_timeout_secs),
        ];
        for (name, value) in whole_secs {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }

        if !(1..=MAX_BINANCE_TRADES).contains(&self.cvd.trades_limit) {
            return Err(ConfigError::Validation(format!(
                "cvd.trades_limit must be within [1, {MAX_BINANCE_TRADES}], got {}",
                self.cvd.trades_limit
            )));
        }

        if !(0.5..=1.0).contains(&self.tape.imbalance_threshold) {
            return Err(ConfigError::Validation(format!(
                "tape.imbalance_threshold must be within [0.5, 1], got {}",
                self.tape.imbalance_threshold
            )));
        }
        if !(self.obi.threshold > 0.0 && self.obi.threshold <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "obi.threshold must be within (0, 1], got {}",
                self.obi.threshold
            )));
        }
        if self.tape.snapshot_capacity < crate::engine::tape::STOPRUN_LOOKBACK {
            return Err(ConfigError::Validation(format!(
                "tape.snapshot_capacity must be at least {}",
                crate::engine::tape::STOPRUN_LOOKBACK
            )));
        }
        let counts = [
            ("tape.max_trades", self.tape.max_trades),
            ("obi.depth", self.obi.depth),
            ("obi.history", self.obi.history),
            ("ofi.window", self.ofi.window),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be non-zero")));
            }
        }
        if self.exchanges.reconnect_min_secs == 0
            || self.exchanges.reconnect_max_secs < self.exchanges.reconnect_min_secs
        {
            return Err(ConfigError::Validation(
                "exchanges.reconnect_min_secs must be > 0 and <= reconnect_max_secs".to_string(),
            ));
        }
        if self.spread.venues.len() < 2 {
            return Err(ConfigError::Validation("spread.venues needs at least two venues".to_string()));
        }
        crate::market_data::normaliser::Symbol::parse(&self.symbol)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.tape.trade_window_ms(), 3_000);
        assert_eq!(settings.tape.min_cooldown_ms(), 5_000);
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut settings = Settings::default();
        settings.tape.imbalance_threshold = 0.2;
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));

        let mut settings = Settings::default();
        settings.cvd.window_secs = 0.0;
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));

        let mut settings = Settings::default();
        settings.symbol = "BTCUSDT".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Symbol(_))));
    }

    #[test]
    fn test_rejects_zero_timeouts_and_bad_limits() {
        let cases: [fn(&mut Settings); 9] = [
            |s| s.tape.log_every_secs = 0,
            |s| s.telegram.timeout_secs = 0,
            |s| s.exchanges.request_timeout_secs = 0,
            |s| s.tape.min_cooldown_secs = -1.0,
            |s| s.obi.cooldown_secs = -0.5,
            |s| s.spread.cooldown_secs = f64::NAN,
            |s| s.cvd.trades_limit = 0,
            |s| s.cvd.trades_limit = 1001,
            |s| s.obi.history = 0,
        ];
        for (i, break_it) in cases.iter().enumerate() {
            let mut settings = Settings::default();
            break_it(&mut settings);
            assert!(
                matches!(settings.validate(), Err(ConfigError::Validation(_))),
                "case {i} should be rejected"
            );
        }

        let mut settings = Settings::default();
        settings.cvd.trades_limit = 1000;
        settings.ofi.cooldown_secs = 0.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_nested_sections() {
        std::env::set_var("TAPEBOT_TELEGRAM__TOKEN", "123:abc");
        std::env::set_var("TAPEBOT_OBI__HISTORY", "30");
        let settings = Settings::load(None);
        std::env::remove_var("TAPEBOT_TELEGRAM__TOKEN");
        std::env::remove_var("TAPEBOT_OBI__HISTORY");

        let settings = settings.unwrap();
        assert_eq!(settings.telegram.token, "123:abc");
        assert_eq!(settings.obi.history, 30);
        assert_eq!(settings.obi.depth, 20);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("tapebot-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "symbol = \"ETH/USDT\"\n[tape]\nlarge_trade_size = 10.0\n[spread]\nvenues = [\"binance\", \"okx\"]"
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.symbol, "ETH/USDT");
        assert_eq!(settings.tape.large_trade_size, 10.0);
        assert_eq!(settings.tape.imbalance_threshold, 0.7);
        assert_eq!(settings.spread.venues, vec![Venue::Binance, Venue::Okx]);
    }
}
