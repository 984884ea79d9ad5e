//! HTTP surface: chat dispatch plus provider administration.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use switchboard_pool::{ChatRequest, PoolError, ProviderPool, ProviderStats};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ProviderEntry;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ProviderPool>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/v1/providers", get(list_providers).post(add_provider))
        .route("/v1/providers/{name}", delete(remove_provider))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);
    match state.pool.chat(&request).instrument(span).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            tracing::warn!(%request_id, error = %err, "chat request failed");
            error_response(&err)
        }
    }
}

async fn list_providers(State(state): State<AppState>) -> Json<HashMap<String, ProviderStats>> {
    Json(state.pool.stats())
}

/// Registers a provider described in the config-file entry shape; the
/// credential is resolved from the environment, never read off the wire.
async fn add_provider(State(state): State<AppState>, Json(entry): Json<ProviderEntry>) -> Response {
    let name = entry.name.clone();
    match entry.resolve(|var| std::env::var(var).ok()) {
        Ok(config) => {
            state.pool.add_provider(config);
            (StatusCode::CREATED, Json(json!({ "registered": name }))).into_response()
        }
        Err(err) => {
            tracing::warn!(provider = %name, error = %err, "provider registration rejected");
            error_response(&err)
        }
    }
}

async fn remove_provider(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if state.pool.remove_provider(&name) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let body = json!({ "error": format!("unknown provider: {name}") });
        (StatusCode::NOT_FOUND, Json(body)).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let healthy = state.pool.is_healthy();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "healthy": healthy }))).into_response()
}

fn error_response(err: &PoolError) -> Response {
    let status = match err {
        PoolError::ContractViolation(_) | PoolError::UnsupportedProtocol(_) => {
            StatusCode::BAD_REQUEST
        }
        PoolError::NoProviders => StatusCode::SERVICE_UNAVAILABLE,
        PoolError::Exhausted { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
