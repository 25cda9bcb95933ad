//! REST control API for callscribe.
//!
//! The desktop shell and the (external) calendar sync talk to the service
//! over localhost HTTP. Control commands are funneled into the service loop
//! through an mpsc channel; status endpoints read shared handles directly.

pub mod error;
pub mod routes;

use crate::session::SessionManager;
use crate::store::StoreSerializer;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::recordings::{ApiCommand, RecordingsState};

pub struct ApiServer {
    port: u16,
    recordings_state: RecordingsState,
    meetings_state: routes::meetings::MeetingsState,
}

impl ApiServer {
    pub fn new(
        port: u16,
        tx: tokio::sync::mpsc::Sender<ApiCommand>,
        sessions: SessionManager,
        store: StoreSerializer,
    ) -> Self {
        Self {
            port,
            recordings_state: RecordingsState { tx, sessions },
            meetings_state: routes::meetings::MeetingsState { store },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::recordings::router(self.recordings_state))
            .merge(routes::meetings::router(self.meetings_state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                      - Service info");
        info!("  GET  /version               - Version info");
        info!("  GET  /recordings            - Active sessions and links");
        info!("  POST /recordings/calendar   - Start calendar-linked recording");
        info!("  POST /recordings/adhoc      - Start ad-hoc window recording");
        info!("  POST /recordings/:id/stop   - Stop a recording");
        info!("  GET  /meetings              - Meeting document");
        info!("  GET  /meetings/:id          - Single meeting record");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "callscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "callscribe"
    }))
}
