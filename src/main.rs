use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use tapebot_rs::cli::{Cli, Command};
use tapebot_rs::config::Settings;
use tapebot_rs::market_data::adapters::{quote_source, BinanceRest};
use tapebot_rs::market_data::normaliser::Symbol;
use tapebot_rs::market_data::router::run_tape;
use tapebot_rs::monitor::{
    run_polling, CvdMonitor, Monitor, ObiMonitor, OfiMonitor, PollSettings, SpreadMonitor,
};
use tapebot_rs::notify::{ConsoleNotifier, Notifier, TelegramNotifier};
use tapebot_rs::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    telemetry::init_tracing(&cli.log_level);

    let mut settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(symbol) = &cli.symbol {
        settings.symbol = symbol.clone();
    }
    settings.dry_run |= cli.dry_run;
    settings.validate().context("validating command line overrides")?;

    telemetry::init_metrics(&settings.metrics_addr)?;

    let symbol = Symbol::parse(&settings.symbol)?;
    let notifier: Arc<dyn Notifier> = if settings.dry_run {
        Arc::new(ConsoleNotifier)
    } else {
        Arc::new(TelegramNotifier::new(&settings.telegram, false)?)
    };

    info!(command = cli.command.as_str(), symbol = %symbol, dry_run = settings.dry_run, "Starting");

    tokio::select! {
        res = run(cli.command, symbol, &settings, notifier) => {
            res.with_context(|| format!("{} bot stopped", cli.command.as_str()))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            Ok(())
        }
    }
}

async fn run(
    command: Command,
    symbol: Symbol,
    settings: &Settings,
    notifier: Arc<dyn Notifier>,
) -> tapebot_rs::Result<()> {
    let exchanges = &settings.exchanges;
    let binance = || BinanceRest::new(&exchanges.binance_rest, exchanges.request_timeout_secs);

    let (mut monitor, interval_secs): (Box<dyn Monitor>, f64) = match command {
        Command::Tape => {
            run_tape(symbol, settings.tape.clone(), exchanges, notifier).await?;
            return Ok(());
        }
        Command::Obi => (
            Box::new(ObiMonitor::new(symbol, binance()?, settings.obi.clone())),
            settings.obi.interval_secs,
        ),
        Command::Cvd => (
            Box::new(CvdMonitor::new(symbol, binance()?, settings.cvd.clone())),
            settings.cvd.interval_secs,
        ),
        Command::Ofi => (
            Box::new(OfiMonitor::new(symbol, binance()?, settings.ofi.clone())),
            settings.ofi.interval_secs,
        ),
        Command::Spread => {
            let sources = settings
                .spread
                .venues
                .iter()
                .map(|venue| quote_source(*venue, exchanges))
                .collect::<Result<Vec<_>, _>>()?;
            (
                Box::new(SpreadMonitor::new(symbol, sources, settings.spread.clone())),
                settings.spread.interval_secs,
            )
        }
    };

    let poll = PollSettings {
        interval: Duration::from_secs_f64(interval_secs),
        error_backoff: Duration::from_secs_f64(settings.error_backoff_secs),
        notify_errors: settings.notify_errors,
    };
    run_polling(monitor.as_mut(), notifier.as_ref(), &poll).await;
    Ok(())
}
