use std::path::PathBuf;
use std::sync::Arc;

use marketboard::config::Config;
use marketboard::metrics::{GatewayMetrics, Metrics};

fn main() {
    let subscriber = tracing_subscriber::fmt().with_ansi(false).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting up logging: {e}");
        std::process::exit(1);
    }

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MARKETBOARD_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    tracing::info!(path = %config_path.display(), "Starting");

    if let Err(e) = run(config_path) {
        tracing::error!("Exiting {:?}", e);
        std::process::exit(1);
    }
}

fn run(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&config_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let registry = prometheus::Registry::new();
    let gateway_metrics = GatewayMetrics::new(&registry)?;
    let metrics = Metrics::new(&registry)?;

    let gateway = Arc::new(config.gateway().with_metrics(gateway_metrics));
    let client = Arc::new(marketboard::Client::from_config(&config, gateway.clone())?);
    tracing::info!(items = config.exporter.items.len(), selector = %config.exporter.selector, "Loaded config");

    let items = Arc::new(arc_swap::ArcSwap::from_pointee(config.exporter.items.clone()));
    let app = marketboard::exporter::router(registry, gateway);

    runtime.spawn(marketboard::exporter::gather(
        client,
        items.clone(),
        config.exporter.clone(),
        config.language,
        metrics,
    ));
    runtime.spawn(marketboard::exporter::watch_reload(config_path, items));

    runtime.block_on(async move {
        axum::Server::try_bind(&config.exporter.listen)?
            .serve(app.into_make_service())
            .await
    })?;

    Ok(())
}
