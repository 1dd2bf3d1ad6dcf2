use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use mini_rag::{Answer, QueryError, RagPipeline};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub app_name: Arc<str>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: AppState, config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let app_name = Arc::clone(&state.app_name);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(app = %app_name, "listening on http://{}", addr);
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": &*state.app_name,
        "chunks": state.pipeline.index().len(),
    }))
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>, (StatusCode, Json<ErrorBody>)> {
    match state.pipeline.ask(&request.question).await {
        Ok(parsed) => Ok(Json(parsed.into_answer())),
        Err(err) => {
            let status = status_for(&err);
            warn!(status = status.as_u16(), error = %err, "query failed");
            Err((status, Json(ErrorBody { error: err.to_string() })))
        }
    }
}

/// HTTP status reported for a failed query.
pub fn status_for(err: &QueryError) -> StatusCode {
    if err.is_timeout() {
        return StatusCode::GATEWAY_TIMEOUT;
    }
    match err {
        QueryError::EmbeddingFailed(_) | QueryError::LlmFailed(_) => StatusCode::BAD_GATEWAY,
        QueryError::RetrievalFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
