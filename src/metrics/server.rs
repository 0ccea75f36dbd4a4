//! HTTP exporter for the view-finder's Prometheus metrics.
//!
//! Every scrape of `/metrics` pulls a fresh [`MetricsSnapshot`] from the
//! snapshot source, folds it into the registry and encodes the result, so
//! nothing has to push updates from the frame loop. `/health` answers `OK`.

use super::{MetricsError, MetricsRegistry, MetricsSnapshot};
use crate::pipeline::ViewFinder;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Produces the snapshot served by one scrape.
pub type SnapshotSource = Arc<dyn Fn() -> MetricsSnapshot + Send + Sync>;

/// Errors from the metrics endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind metrics endpoint {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics endpoint stopped: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Clone)]
struct ScrapeState {
    registry: Arc<MetricsRegistry>,
    source: SnapshotSource,
}

impl ScrapeState {
    fn scrape(&self) -> Result<String, MetricsError> {
        self.registry.update(&(self.source)());
        self.registry.encode()
    }
}

/// Serves `/metrics` and `/health` for one view-finder.
pub struct MetricsServer {
    addr: SocketAddr,
    state: ScrapeState,
}

impl MetricsServer {
    pub fn new(addr: SocketAddr, registry: MetricsRegistry, source: SnapshotSource) -> Self {
        Self {
            addr,
            state: ScrapeState {
                registry: Arc::new(registry),
                source,
            },
        }
    }

    /// Exports the counters of `viewfinder` on `0.0.0.0:port`.
    pub fn for_view_finder(port: u16, registry: MetricsRegistry, viewfinder: Arc<ViewFinder>) -> Self {
        let source: SnapshotSource = Arc::new(move || MetricsSnapshot::from_view_finder(&viewfinder));
        Self::new(([0, 0, 0, 0], port).into(), registry, source)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Binds and serves until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;

        tracing::info!(addr = %self.addr, "Metrics endpoint listening");
        axum::serve(listener, app).await.map_err(ServerError::Serve)
    }
}

async fn metrics_handler(State(state): State<ScrapeState>) -> impl IntoResponse {
    match state.scrape() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {e}"),
            )
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraType, MockCamera, MockCameraPool, PreviewSurface};
    use crate::decode::BarcodeDecoder;
    use crate::pipeline::{FramePipeline, InlineExecutor};
    use axum::response::Response;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_scrape_reads_live_view_finder() {
        let pool = Arc::new(MockCameraPool::with_both());
        let pipeline = FramePipeline::new(BarcodeDecoder::from_names(&["qr"]), Arc::new(InlineExecutor));
        let viewfinder = Arc::new(ViewFinder::new(pool.clone(), CameraType::Back, Arc::new(pipeline)));
        viewfinder.on_surface_available(PreviewSurface::new(1, 640, 480)).unwrap();

        let server = MetricsServer::for_view_finder(0, MetricsRegistry::new().unwrap(), viewfinder.clone());
        let camera = pool.device(CameraType::Back).unwrap();

        camera.emit_frame(MockCamera::noise_frame(64, 48, 1));
        let first = body_text(metrics_handler(State(server.state.clone())).await.into_response()).await;
        assert!(first.contains("viewfinder_no_matches_total 1"));
        assert!(first.contains("viewfinder_camera_starts_total 1"));

        camera.emit_frame(MockCamera::noise_frame(64, 48, 2));
        let second = body_text(metrics_handler(State(server.state.clone())).await.into_response()).await;
        assert!(second.contains("viewfinder_no_matches_total 2"));
        assert!(second.contains("viewfinder_decode_tasks_total 2"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_bind_conflict_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let source: SnapshotSource = Arc::new(MetricsSnapshot::default);

        let server = MetricsServer::new(addr, MetricsRegistry::new().unwrap(), source);
        assert_eq!(server.addr(), addr);
        assert!(matches!(server.run().await, Err(ServerError::Bind { .. })));
    }
}
