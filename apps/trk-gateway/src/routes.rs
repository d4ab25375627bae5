//! 路由定义
//!
//! - 健康检查：/health
//! - 命令任务：/tasks, /tasks/{task_id}
//! - 指标：/metrics

use super::AppState;
use super::handlers::*;
use crate::middleware::request_context;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", post(submit_task))
        .route("/tasks/:task_id", get(get_task))
        .route("/metrics", get(get_metrics))
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}
