//! HTTP control surface
//!
//! A small JSON API for the dashboard and operators: health and status
//! reads, plus start/stop of the dialogue worker. CORS is permissive; the
//! node only ever listens on the trusted monitoring network.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::assistant::Assistant;

/// Build the control API router
pub fn router(assistant: Arc<Assistant>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(assistant)
}

async fn health(State(assistant): State<Arc<Assistant>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "state": assistant.state(),
        "running": assistant.is_running(),
    }))
}

async fn status(State(assistant): State<Arc<Assistant>>) -> Json<Value> {
    Json(json!({
        "state": assistant.state(),
        "running": assistant.is_running(),
        "wake_word": assistant.wake_word(),
        "interactions": assistant.interactions(),
    }))
}

async fn start(State(assistant): State<Arc<Assistant>>) -> Json<Value> {
    let msg = if assistant.start() {
        "started"
    } else {
        "already running"
    };
    Json(json!({"ok": true, "msg": msg}))
}

async fn stop(State(assistant): State<Arc<Assistant>>) -> Json<Value> {
    assistant.stop();
    Json(json!({"ok": true, "msg": "stopping"}))
}
