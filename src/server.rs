//! HTTP control surface for the fusion engine.
//!
//! Thin transport wrapper over the registry's `ingest`/`reset`/`is_ready`
//! operations:
//! - `POST /ingest` feeds one frame and returns the snapshot
//! - `POST /sessions/:subject/reset` reinitializes a session
//! - `GET /health` liveness and version
//! - `GET /status` engine counters and live session count

use crate::classifier::{ClassifierPort, HeuristicClassifier};
use crate::config::EngineConfig;
use crate::core::session::Snapshot;
use crate::events::{EpisodeDispatcher, JsonlSink};
use crate::registry::SessionRegistry;
use crate::signal::{Detection, FrameSignals};
use crate::stats::{EngineStats, StatsSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Engine parameters for new sessions
    pub engine: EngineConfig,
    /// Directory for the episode log
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn new(port: u16, engine: EngineConfig, data_dir: PathBuf) -> Self {
        Self {
            port,
            engine,
            data_dir,
        }
    }
}

/// Shared server state.
pub struct ServerState {
    registry: SessionRegistry,
    instance_id: Uuid,
    // Keeps the episode worker alive for the life of the server.
    _dispatcher: EpisodeDispatcher,
}

impl ServerState {
    /// Create server state with the built-in heuristic classifier.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_classifier(config, Arc::new(HeuristicClassifier::default()))
    }

    /// Create server state with an injected classifier.
    pub fn with_classifier(config: &ServerConfig, classifier: Arc<dyn ClassifierPort>) -> Self {
        let stats = Arc::new(EngineStats::new());
        let sink = Arc::new(JsonlSink::new(config.data_dir.join("episodes.jsonl")));
        let dispatcher = EpisodeDispatcher::new(
            sink,
            config.engine.episode_queue_capacity,
            stats.clone(),
        );
        let registry = SessionRegistry::new(
            config.engine.clone(),
            classifier,
            dispatcher.sender(),
            stats,
        );

        Self {
            registry,
            instance_id: Uuid::new_v4(),
            _dispatcher: dispatcher,
        }
    }
}

/// One frame of detector signals for a subject.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub subject: String,
    pub eye_closed_detected: bool,
    pub mouth_open_detected: bool,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
}

/// Engine status response.
#[derive(Serialize)]
pub struct StatusResponse {
    pub sessions: usize,
    pub stats: StatsSnapshot,
}

/// Error response.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.to_string(),
    })
}

/// GET /status
async fn status(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        sessions: state.registry.len(),
        stats: state.registry.stats().snapshot(),
    })
}

/// POST /ingest
async fn ingest(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<Snapshot>, (StatusCode, Json<ErrorResponse>)> {
    if request.subject.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "subject must not be empty".to_string(),
                code: "EMPTY_SUBJECT".to_string(),
            }),
        ));
    }

    let signals = FrameSignals {
        eye_closed_detected: request.eye_closed_detected,
        mouth_open_detected: request.mouth_open_detected,
        detections: request.detections,
    };

    let snapshot = state
        .registry
        .ingest(&request.subject, &signals)
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid frame signals: {e}"),
                    code: "INVALID_SIGNALS".to_string(),
                }),
            )
        })?;

    Ok(Json(snapshot))
}

/// POST /sessions/:subject/reset
async fn reset_session(
    State(state): State<Arc<ServerState>>,
    Path(subject): Path<String>,
) -> Json<serde_json::Value> {
    state.registry.reset(&subject);
    Json(serde_json::json!({
        "status": "ok",
        "message": "session has been reset",
        "subject": subject,
    }))
}

/// Run the HTTP server. Returns the bound address and a shutdown handle.
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    run_with_state(config, state).await
}

/// Run the HTTP server with pre-built state (custom classifier injection).
pub async fn run_with_state(
    config: ServerConfig,
    state: Arc<ServerState>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/ingest", post(ingest))
        .route("/sessions/:subject/reset", post(reset_session))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("fusion engine listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("server shutdown signal received");
            })
            .await
        {
            tracing::error!("server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
