use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use tracing::Instrument;

use axum::extract::State;
use axum::http::StatusCode;

use crate::client::{Client, CurrentQuery};
use crate::config::{Config, ExporterConfig, WatchItem};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::metrics::Metrics;
use crate::Language;

#[derive(Clone)]
struct Scrape {
    registry: prometheus::Registry,
    gateway: Arc<Gateway>,
}

/// `GET /metrics` over `registry`, refreshing the gateway gauges first.
pub fn router(registry: prometheus::Registry, gateway: Arc<Gateway>) -> axum::Router {
    axum::Router::new()
        .route("/metrics", axum::routing::get(scrape))
        .with_state(Scrape { registry, gateway })
}

#[tracing::instrument(skip(state))]
async fn scrape(State(state): State<Scrape>) -> (StatusCode, String) {
    if let Some(metrics) = state.gateway.metrics() {
        metrics.observe_gateway(&state.gateway);
    }

    match prometheus::TextEncoder::new().encode_to_string(&state.registry.gather()) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!("Encoding Metrics {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

/// Loads one item and updates its gauges.
pub async fn update_item(
    client: &Client,
    item: &WatchItem,
    settings: &ExporterConfig,
    language: Language,
    metrics: &Metrics,
) -> Result<()> {
    let query = CurrentQuery {
        selector: settings.selector,
        listings: settings.listings,
        entries: settings.entries,
        quality: item.quality,
        trim_fields: false,
    };

    let data = client.get_current(item.id, &query).await?;
    if !data.has_data() {
        tracing::warn!("No data for item");
    }

    let id = item.id.to_string();
    let name = client.item_name(item.id, language).unwrap_or(&id);
    metrics.record(item, name, settings.selector.name(), &data);

    tracing::info!(listings = data.listings().len(), "Updated item");
    Ok(())
}

/// Polls every watched item in random order, forever.
///
/// The item list is re-read at the start of each round, so reloads are picked up
/// without restarting.
pub async fn gather(
    client: Arc<Client>,
    items: Arc<ArcSwap<Vec<WatchItem>>>,
    settings: ExporterConfig,
    language: Language,
    metrics: Metrics,
) {
    let mut rng = rand::rngs::SmallRng::from_entropy();

    loop {
        tracing::info!("Loading Data");
        let start_time = std::time::Instant::now();

        let shuffled = {
            let mut tmp: Vec<_> = (*items.load_full()).clone();
            tmp.shuffle(&mut rng);
            tmp
        };

        for item in shuffled.iter() {
            async {
                if let Err(e) = update_item(&client, item, &settings, language, &metrics).await {
                    tracing::error!("Loading current data {:?}", e);
                }
            }
            .instrument(tracing::info_span!("Updating Item Stats", item = %item.id, quality = ?item.quality))
            .await;

            tokio::time::sleep(Duration::from_millis(rng.gen_range(125..500))).await;
        }

        metrics.last_update.set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(elapsed = ?start_time.elapsed(), items = shuffled.len(), "Updated all items");

        tokio::time::sleep(Duration::from_secs(settings.interval_secs)).await;
    }
}

/// Re-reads the config file and swaps in its item list.
pub async fn reload_items(path: &std::path::Path, items: &ArcSwap<Vec<WatchItem>>) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path).await?;
    let config = Config::from_yaml(&raw)?;

    let count = config.exporter.items.len();
    items.store(Arc::new(config.exporter.items));
    Ok(count)
}

/// Reloads the item list whenever the process receives SIGHUP.
#[cfg(unix)]
pub async fn watch_reload(path: PathBuf, items: Arc<ArcSwap<Vec<WatchItem>>>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Installing SIGHUP handler {:?}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        match reload_items(&path, &items).await {
            Ok(count) => tracing::info!(count, "Reloaded items"),
            Err(e) => tracing::error!("Reloading config {:?}", e),
        }
    }
}

#[cfg(not(unix))]
pub async fn watch_reload(_path: PathBuf, _items: Arc<ArcSwap<Vec<WatchItem>>>) {
    std::future::pending::<()>().await
}
