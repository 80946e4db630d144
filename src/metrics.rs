use crate::config::WatchItem;
use crate::records::CurrentData;

/// Counters kept by the [`crate::Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayMetrics {
    pub requests: prometheus::IntCounterVec,
    pub throttle_wait: prometheus::Histogram,
    /// Refreshed on every scrape.
    pub rate_limit: prometheus::IntGauge,
    pub since_success: prometheus::Gauge,
}

impl GatewayMetrics {
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let requests = prometheus::IntCounterVec::new(
            prometheus::Opts::new("marketboard_requests", "The number of requests sent to the marketboard API"),
            &["outcome"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        let throttle_wait = prometheus::Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "marketboard_throttle_wait_seconds",
                "Time spent waiting for the rate limit before sending a request",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.15, 0.25, 0.5, 1.0, 2.5]),
        )?;
        registry.register(Box::new(throttle_wait.clone()))?;

        let rate_limit = prometheus::IntGauge::new(
            "marketboard_max_calls_per_second",
            "The configured request budget of the gateway",
        )?;
        registry.register(Box::new(rate_limit.clone()))?;

        let since_success = prometheus::Gauge::new(
            "marketboard_seconds_since_success",
            "Seconds since the last successful request (or since startup)",
        )?;
        registry.register(Box::new(since_success.clone()))?;

        Ok(Self {
            requests,
            throttle_wait,
            rate_limit,
            since_success,
        })
    }

    pub fn observe_gateway(&self, gateway: &crate::Gateway) {
        self.rate_limit.set(i64::from(gateway.max_calls_per_second()));
        self.since_success.set(gateway.since_last_success().as_secs_f64());
    }

    pub fn record_outcome(&self, status: u16) {
        let outcome = match status {
            200 => "ok",
            400 => "invalid_parameters",
            404 => "unknown_target",
            _ => "failed",
        };
        self.requests.with_label_values(&[outcome]).inc();
    }
}

/// Price gauges published by the exporter.
#[derive(Debug, Clone)]
pub struct Metrics {
    min_prices: prometheus::GaugeVec,
    average_prices: prometheus::GaugeVec,
    units_for_sale: prometheus::GaugeVec,
    sale_velocity: prometheus::GaugeVec,
    stack_sizes: prometheus::GaugeVec,
    pub last_update: prometheus::Gauge,
}

impl Metrics {
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let labels = &["item", "name", "quality", "selector"];

        let min_prices = prometheus::GaugeVec::new(
            prometheus::Opts::new("min_price", "The cheapest listed Price per Unit (in gil)"),
            labels,
        )?;
        registry.register(Box::new(min_prices.clone()))?;

        let average_prices = prometheus::GaugeVec::new(
            prometheus::Opts::new("average_price", "The average listed Price per Unit (in gil)"),
            labels,
        )?;
        registry.register(Box::new(average_prices.clone()))?;

        let units_for_sale = prometheus::GaugeVec::new(
            prometheus::Opts::new("units_for_sale", "The number of units currently listed"),
            &["item", "name", "selector"],
        )?;
        registry.register(Box::new(units_for_sale.clone()))?;

        let sale_velocity = prometheus::GaugeVec::new(
            prometheus::Opts::new("sale_velocity", "The number of sales per day"),
            labels,
        )?;
        registry.register(Box::new(sale_velocity.clone()))?;

        let stack_sizes = prometheus::GaugeVec::new(
            prometheus::Opts::new("common_stack_size", "The stack size sold most often"),
            labels,
        )?;
        registry.register(Box::new(stack_sizes.clone()))?;

        let last_update =
            prometheus::Gauge::new("last_updated", "The Unix Timestamp of the last update")?;
        registry.register(Box::new(last_update.clone()))?;

        Ok(Self {
            min_prices,
            average_prices,
            units_for_sale,
            sale_velocity,
            stack_sizes,
            last_update,
        })
    }

    pub fn record(&self, item: &WatchItem, name: &str, selector: &str, data: &CurrentData) {
        let id = item.id.to_string();
        let quality: &'static str = (&item.quality).into();
        let labels: &[&str; 4] = &[id.as_str(), name, quality, selector];

        if let Some(price) = data.min_price.get(item.quality) {
            self.min_prices.with_label_values(labels).set(*price as f64);
        }
        if let Some(price) = data.current_average_price.get(item.quality) {
            self.average_prices.with_label_values(labels).set(*price);
        }
        if let Some(velocity) = data.sale_velocity.get(item.quality) {
            self.sale_velocity.with_label_values(labels).set(*velocity);
        }
        if let Some(units) = data.units_for_sale {
            self.units_for_sale.with_label_values(&[id.as_str(), name, selector]).set(units as f64);
        }

        let common = data
            .stack_size_histogram
            .get(item.quality)
            .and_then(|histogram| histogram.most_common())
            .and_then(|(label, _)| label.parse::<f64>().ok());
        if let Some(stack_size) = common {
            self.stack_sizes.with_label_values(labels).set(stack_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::{ItemId, ItemQuality};

    #[test]
    fn records_item_gauges() {
        let registry = prometheus::Registry::new();
        let metrics = Metrics::new(&registry).unwrap();

        let data = CurrentData::from_value(
            serde_json::json!({
                "itemID": 14,
                "minPriceHQ": 300,
                "currentAveragePriceHQ": 320.5,
                "hqSaleVelocity": 4,
                "unitsForSale": 12,
                "stackSizeHistogramHQ": { "1": 1, "10": 3 }
            }),
            &Normalizer::default(),
        )
        .unwrap();
        let item = WatchItem {
            id: ItemId::new(14).unwrap(),
            quality: ItemQuality::HQ,
        };
        metrics.record(&item, "Fire Cluster", "Zalera", &data);

        let labels = &["14", "Fire Cluster", "hq", "Zalera"];
        assert_eq!(metrics.min_prices.with_label_values(labels).get(), 300.0);
        assert_eq!(metrics.average_prices.with_label_values(labels).get(), 320.5);
        assert_eq!(metrics.sale_velocity.with_label_values(labels).get(), 4.0);
        assert_eq!(metrics.stack_sizes.with_label_values(labels).get(), 10.0);
        assert_eq!(
            metrics.units_for_sale.with_label_values(&["14", "Fire Cluster", "Zalera"]).get(),
            12.0
        );
    }

    #[test]
    fn gateway_outcomes() {
        let registry = prometheus::Registry::new();
        let metrics = GatewayMetrics::new(&registry).unwrap();
        metrics.record_outcome(200);
        metrics.record_outcome(200);
        metrics.record_outcome(404);

        assert_eq!(metrics.requests.with_label_values(&["ok"]).get(), 2);
        assert_eq!(metrics.requests.with_label_values(&["unknown_target"]).get(), 1);
        assert_eq!(metrics.requests.with_label_values(&["failed"]).get(), 0);
    }
}
