//! Handlers 模块

pub mod metrics;
pub mod tasks;

pub use metrics::*;
pub use tasks::*;

use axum::{Json, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
