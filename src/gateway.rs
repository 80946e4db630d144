use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::metrics::GatewayMetrics;

pub const DEFAULT_MAX_CALLS_PER_SECOND: u32 = 20;

/// Added on top of the remaining interval whenever a caller has to wait.
const SAFETY_MARGIN: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Throttle {
    max_calls_per_second: u32,
    /// When the last successful call completed.
    last_call: Instant,
    /// Dispatch time of the most recent call that has not completed yet.
    in_flight: Option<Instant>,
}

impl Throttle {
    fn min_interval(&self) -> Duration {
        Duration::from_secs(1) / self.max_calls_per_second
    }

    fn anchor(&self) -> Instant {
        match self.in_flight {
            Some(dispatched) => dispatched.max(self.last_call),
            None => self.last_call,
        }
    }

    /// How long a caller arriving at `now` has to wait before dispatching.
    fn wait_at(&self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.anchor());
        let min_interval = self.min_interval();
        (elapsed < min_interval).then(|| min_interval - elapsed + SAFETY_MARGIN)
    }
}

/// Sends GET requests to the marketboard API while keeping to a calls-per-second budget.
///
/// Share one gateway (behind an `Arc`) between everything that talks to the API, the
/// budget is per gateway.
#[derive(Debug)]
pub struct Gateway {
    http: OnceLock<reqwest::Client>,
    /// Serializes the check-and-wait, so waiting callers queue up in order.
    gate: tokio::sync::Mutex<()>,
    throttle: Mutex<Throttle>,
    metrics: Option<GatewayMetrics>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// The HTTP client is only created once the first request goes out.
    pub fn new() -> Self {
        Self {
            http: OnceLock::new(),
            gate: tokio::sync::Mutex::new(()),
            throttle: Mutex::new(Throttle {
                max_calls_per_second: DEFAULT_MAX_CALLS_PER_SECOND,
                last_call: Instant::now(),
                in_flight: None,
            }),
            metrics: None,
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        let gateway = Self::new();
        let _ = gateway.http.set(client);
        gateway
    }

    pub fn with_metrics(mut self, metrics: GatewayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_max_calls_per_second(self, value: u32) -> Self {
        self.set_max_calls_per_second(value);
        self
    }

    pub fn max_calls_per_second(&self) -> u32 {
        self.throttle().max_calls_per_second
    }

    pub fn set_max_calls_per_second(&self, value: u32) {
        self.throttle().max_calls_per_second = value.max(1);
    }

    pub fn metrics(&self) -> Option<&GatewayMetrics> {
        self.metrics.as_ref()
    }

    /// Time since the last 200 response, or since the gateway was created.
    pub fn since_last_success(&self) -> Duration {
        self.throttle().last_call.elapsed()
    }

    fn throttle(&self) -> MutexGuard<'_, Throttle> {
        self.throttle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn http(&self) -> &reqwest::Client {
        self.http.get_or_init(reqwest::Client::new)
    }

    async fn acquire(&self) -> Permit<'_> {
        let _gate = self.gate.lock().await;

        let wait = self.throttle().wait_at(Instant::now());
        if let Some(wait) = wait {
            tracing::debug!(?wait, "Waiting out rate limit");
            if let Some(metrics) = &self.metrics {
                metrics.throttle_wait.observe(wait.as_secs_f64());
            }
            tokio::time::sleep(wait).await;
        }

        let dispatched = Instant::now();
        self.throttle().in_flight = Some(dispatched);

        Permit {
            gateway: self,
            dispatched,
        }
    }

    /// Sends a GET request and decodes the JSON body.
    ///
    /// Anything but a 200 is returned as [`Error::Request`], there are no retries.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
        let permit = self.acquire().await;

        let resp = self.http().get(url).send().await?;

        let status = resp.status().as_u16();
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(status);
        }

        if status != 200 {
            tracing::error!(status, "Non Success status");
            return Err(Error::request(status, url));
        }
        permit.succeeded();

        let body: serde_json::Value = resp.json().await?;
        tracing::trace!(?body, "Response");
        Ok(body)
    }
}

/// Held from dispatch until the response status is known.
///
/// Dropping it without calling `succeeded` releases the reservation but leaves the
/// last successful call untouched.
struct Permit<'g> {
    gateway: &'g Gateway,
    dispatched: Instant,
}

impl Permit<'_> {
    fn succeeded(self) {
        self.gateway.throttle().last_call = Instant::now();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut throttle = self.gateway.throttle();
        if throttle.in_flight == Some(self.dispatched) {
            throttle.in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestServer;
    use axum::http::StatusCode;
    use serde_json::json;

    fn ok_server() -> TestServer {
        TestServer::spawn(|path| match path {
            "/bad" => (StatusCode::BAD_REQUEST, json!({})),
            "/missing" => (StatusCode::NOT_FOUND, json!({})),
            "/broken" => (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
            _ => (StatusCode::OK, json!({ "path": path })),
        })
    }

    #[test]
    fn wait_includes_safety_margin() {
        let now = Instant::now();
        let throttle = Throttle {
            max_calls_per_second: 20,
            last_call: now,
            in_flight: None,
        };

        assert_eq!(throttle.min_interval(), Duration::from_millis(50));
        assert_eq!(throttle.wait_at(now), Some(Duration::from_millis(150)));
        assert_eq!(
            throttle.wait_at(now + Duration::from_millis(20)),
            Some(Duration::from_millis(130))
        );
        assert_eq!(throttle.wait_at(now + Duration::from_millis(50)), None);
    }

    #[test]
    fn in_flight_calls_anchor_the_window() {
        let now = Instant::now();
        let throttle = Throttle {
            max_calls_per_second: 10,
            last_call: now,
            in_flight: Some(now + Duration::from_millis(200)),
        };

        assert_eq!(throttle.wait_at(now + Duration::from_millis(250)), Some(Duration::from_millis(150)));
    }

    #[test]
    fn budget_never_drops_to_zero() {
        let gateway = Gateway::new();
        gateway.set_max_calls_per_second(0);
        assert_eq!(gateway.max_calls_per_second(), 1);
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced() {
        let server = ok_server();
        let gateway = Gateway::new();

        gateway.fetch(&server.url("/one")).await.unwrap();
        gateway.fetch(&server.url("/two")).await.unwrap();

        let arrivals = server.arrivals();
        assert_eq!(arrivals.len(), 2);
        assert!(
            arrivals[1] - arrivals[0] >= Duration::from_millis(145),
            "spacing was {:?}",
            arrivals[1] - arrivals[0]
        );
    }

    #[tokio::test]
    async fn concurrent_calls_are_spaced() {
        let server = ok_server();
        let gateway = Gateway::new();
        gateway.fetch(&server.url("/warmup")).await.unwrap();

        let (a_url, b_url) = (server.url("/a"), server.url("/b"));
        let (a, b) = tokio::join!(gateway.fetch(&a_url), gateway.fetch(&b_url));
        a.unwrap();
        b.unwrap();

        let arrivals = server.arrivals();
        assert_eq!(arrivals.len(), 3);
        assert!(
            arrivals[2] - arrivals[1] >= Duration::from_millis(145),
            "spacing was {:?}",
            arrivals[2] - arrivals[1]
        );
    }

    #[tokio::test]
    async fn creates_client_lazily() {
        let server = ok_server();
        let gateway = Gateway::new();
        assert!(gateway.http.get().is_none());

        let body = gateway.fetch(&server.url("/lazy")).await.unwrap();
        assert_eq!(body, json!({ "path": "/lazy" }));
        assert!(gateway.http.get().is_some());
    }

    #[tokio::test]
    async fn classifies_failures() {
        let server = ok_server();
        let gateway = Gateway::new().with_max_calls_per_second(1000);

        for (path, status, failure) in [
            ("/bad", 400, crate::RequestFailure::InvalidParameters),
            ("/missing", 404, crate::RequestFailure::UnknownTarget),
            ("/broken", 500, crate::RequestFailure::Generic),
        ] {
            let url = server.url(path);
            match gateway.fetch(&url).await {
                Err(Error::Request { status: s, url: u, failure: f }) => {
                    assert_eq!(s, status);
                    assert_eq!(u, url);
                    assert_eq!(f, failure);
                }
                other => panic!("expected request error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn failures_do_not_advance_the_window() {
        let server = ok_server();
        let gateway = Gateway::new();
        let before = gateway.throttle().last_call;

        assert!(gateway.fetch(&server.url("/missing")).await.is_err());

        let throttle = gateway.throttle();
        assert_eq!(throttle.last_call, before);
        assert_eq!(throttle.in_flight, None);
    }

    #[tokio::test]
    async fn abandoned_wait_leaves_state_alone() {
        let server = ok_server();
        let gateway = Gateway::new();
        gateway.fetch(&server.url("/one")).await.unwrap();
        let last_call = gateway.throttle().last_call;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), gateway.fetch(&server.url("/two"))).await;
        assert!(abandoned.is_err());

        {
            let throttle = gateway.throttle();
            assert_eq!(throttle.last_call, last_call);
            assert_eq!(throttle.in_flight, None);
        }
        assert_eq!(server.paths(), vec!["/one".to_string()]);

        gateway.fetch(&server.url("/three")).await.unwrap();
        assert_eq!(server.paths().len(), 2);
    }

    #[tokio::test]
    async fn metrics_count_outcomes() {
        let server = ok_server();
        let registry = prometheus::Registry::new();
        let metrics = GatewayMetrics::new(&registry).unwrap();
        let gateway = Gateway::new().with_metrics(metrics.clone());

        gateway.fetch(&server.url("/ok")).await.unwrap();
        let _ = gateway.fetch(&server.url("/bad")).await;

        assert_eq!(metrics.requests.with_label_values(&["ok"]).get(), 1);
        assert_eq!(metrics.requests.with_label_values(&["invalid_parameters"]).get(), 1);
        assert!(metrics.throttle_wait.get_sample_count() >= 1);
    }
}
