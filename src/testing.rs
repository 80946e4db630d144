//! A local HTTP server standing in for the marketboard API in tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use serde_json::Value;

type Hits = Arc<Mutex<Vec<(String, Instant)>>>;
type Responder = Arc<dyn Fn(&str) -> (StatusCode, Value) + Send + Sync>;

pub struct TestServer {
    pub base_url: String,
    hits: Hits,
}

impl TestServer {
    /// Starts a server answering every request through `respond`, which gets the path and query.
    pub fn spawn(respond: impl Fn(&str) -> (StatusCode, Value) + Send + Sync + 'static) -> Self {
        let hits: Hits = Arc::default();
        let respond: Responder = Arc::new(respond);

        let app = axum::Router::new()
            .fallback(handle)
            .with_state((hits.clone(), respond));

        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Paths requested so far, in arrival order.
    pub fn paths(&self) -> Vec<String> {
        self.hits.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.hits.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

async fn handle(
    State((hits, respond)): State<(Hits, Responder)>,
    uri: Uri,
) -> (StatusCode, axum::Json<Value>) {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    hits.lock().unwrap().push((path.clone(), Instant::now()));

    let (status, body) = respond(&path);
    (status, axum::Json(body))
}
