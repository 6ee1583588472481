use tracing_subscriber::EnvFilter;

/// Compact fmt subscriber; `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(addr: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use metrics_exporter_prometheus::PrometheusBuilder;

    let socket: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics_addr {addr:?}"))?;
    PrometheusBuilder::new()
        .with_http_listener(socket)
        .install()
        .context("prometheus exporter install")?;

    tracing::info!(%socket, "Prometheus exporter listening on /metrics");
    metrics::gauge!("tapebot_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_addr: &str) -> anyhow::Result<()> {
    tracing::debug!("metrics exporter disabled at build time");
    Ok(())
}
