//! 命令任务 handlers
//!
//! - POST /tasks
//! - GET /tasks/{task_id}

use crate::AppState;
use crate::utils::response::{control_error, not_found_error};
use api_contract::{ApiResponse, TaskOutcomeDto, TaskRequestDto, TaskStatusDto};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::TaskId;
use trk_control::{CommandOutcome, TaskRecord, TaskRequest, TaskTarget};

#[derive(serde::Deserialize)]
pub struct TaskPath {
    task_id: String,
}

/// 受理命令任务
pub async fn submit_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequestDto>,
) -> Response {
    let task_id = req.task_id.to_string();
    let alias = req.alias;
    let request = TaskRequest {
        target: TaskTarget {
            task_id: req.task_id,
            vendor: req.vendor,
            uid: req.uid.filter(|uid| !uid.trim().is_empty()),
            transport: req.transport,
        },
        alias,
        payload: req.payload,
    };
    match state.commands.handle(request).await {
        Ok(outcome) => {
            let kind = outcome.kind().to_string();
            let messages = outcome.messages().to_vec();
            let (result, reported) = match outcome {
                CommandOutcome::Formatted {
                    result, reported, ..
                } => (Some(result), Some(reported)),
                _ => (None, None),
            };
            let dto = TaskOutcomeDto {
                task_id,
                alias,
                outcome: kind,
                messages,
                result,
                reported,
            };
            (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
        }
        Err(err) => control_error(err),
    }
}

/// 查询任务状态
pub async fn get_task(State(state): State<AppState>, Path(path): Path<TaskPath>) -> Response {
    match state.commands.tasks().get(&TaskId::new(path.task_id)).await {
        Some(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(task_to_dto(record))),
        )
            .into_response(),
        None => not_found_error(),
    }
}

fn task_to_dto(record: TaskRecord) -> TaskStatusDto {
    TaskStatusDto {
        task_id: record.task_id.to_string(),
        alias: record.alias,
        status: record.status.as_str().to_string(),
        result: record.result,
        detail: record.detail,
        updated_at_ms: record.updated_at_ms,
    }
}
