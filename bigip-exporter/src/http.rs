//! HTTP server for the scrape, health and index endpoints.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::dispatch::{ScrapeDispatcher, ScrapeRequest};
use crate::registry::ExpositionFormat;

const HEALTH_BODY: &str = r#"{"alive": true}"#;

const INDEX_HTML: &str = r#"<html>
<head><title>BIG-IP Exporter</title></head>
<body>
<h1>BIG-IP Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<ScrapeDispatcher>,
}

/// Create the HTTP router.
pub fn create_router(dispatcher: Arc<ScrapeDispatcher>) -> Router {
    let state = AppState { dispatcher };

    Router::new()
        .route("/", get(index_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health-check", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(
    State(state): State<AppState>,
    Query(request): Query<ScrapeRequest>,
    headers: HeaderMap,
) -> Response {
    match state.dispatcher.dispatch(&request).await {
        Ok(exposition) => {
            let format = ExpositionFormat::negotiate(
                headers
                    .get(header::ACCEPT)
                    .and_then(|value| value.to_str().ok()),
            );

            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, format.content_type())],
                format.render(exposition.body),
            )
                .into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(
                    device = ?request.target,
                    module = ?request.module,
                    error = %e,
                    "Rejected scrape request"
                );
            } else {
                error!(
                    device = ?request.target,
                    module = ?request.module,
                    error = %e,
                    "Scrape failed"
                );
            }
            e.into_response()
        }
    }
}

/// Handler for the /health-check endpoint.
async fn health_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        HEALTH_BODY,
    )
        .into_response()
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// HTTP server configuration.
pub struct HttpServer {
    dispatcher: Arc<ScrapeDispatcher>,
    bind_address: String,
    bind_port: u16,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(dispatcher: Arc<ScrapeDispatcher>, bind_address: String, bind_port: u16) -> Self {
        Self {
            dispatcher,
            bind_address,
            bind_port,
        }
    }

    /// Run the HTTP server until binding or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = create_router(self.dispatcher);

        let listener = tokio::net::TcpListener::bind((self.bind_address.as_str(), self.bind_port))
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to bind to {}:{}: {}",
                    self.bind_address,
                    self.bind_port,
                    e
                )
            })?;

        info!(
            addr = %listener.local_addr()?,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
