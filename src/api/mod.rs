//! REST API server for screening interviews.
//!
//! Provides HTTP endpoints for:
//! - Interview lifecycle (start, submit response)
//! - Recruiter report
//! - Session inspection and cleanup

pub mod error;
pub mod routes;
pub mod state;

use crate::config::ServerConfig;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::info;

pub use state::AppState;

pub struct ApiServer {
    host: String,
    port: u16,
    max_upload_bytes: usize,
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState, config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            max_upload_bytes: config.max_upload_bytes,
            state,
        }
    }

    /// Builds the full application router.
    pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
        Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::interview::router(state.clone()))
            .merge(routes::report::router(state))
            .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)))
    }

    pub async fn start(self, shutdown: CancellationToken) -> Result<()> {
        let app = Self::router(self.state, self.max_upload_bytes);

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET    /                  - Service info");
        info!("  GET    /version           - Get version info");
        info!("  POST   /start_interview   - Generate introduction and questions");
        info!("  POST   /submit_response   - Transcribe a recorded answer");
        info!("  GET    /recruiter_report  - Evaluation report (HTML, ?format=json)");
        info!("  GET    /interviews        - List interview sessions");
        info!("  GET    /interviews/:id    - Get one session");
        info!("  DELETE /interviews/:id    - Discard a session");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "screener",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "screener"
    }))
}
