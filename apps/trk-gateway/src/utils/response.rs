//! HTTP 响应辅助函数
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use trk_control::ControlError;

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 任务未找到
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("TASK.NOT_FOUND", "task not found")),
    )
        .into_response()
}

/// 命令链路错误 → 状态码 + 错误码
pub fn control_error(err: ControlError) -> Response {
    let (status, code) = match &err {
        ControlError::Payload(_) | ControlError::MissingUid(_) => {
            (StatusCode::BAD_REQUEST, "INVALID.REQUEST")
        }
        ControlError::NotRegistered(_) => (StatusCode::BAD_REQUEST, "VENDOR.UNKNOWN"),
        ControlError::NotConnected(_) => (StatusCode::CONFLICT, "DEVICE.OFFLINE"),
        ControlError::Unsupported(_) => (StatusCode::UNPROCESSABLE_ENTITY, "COMMAND.UNSUPPORTED"),
        ControlError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "COMMAND.NOT_IMPLEMENTED"),
        ControlError::Resolve(_)
        | ControlError::Dispatch(_)
        | ControlError::Report(_)
        | ControlError::Timeout(_) => (StatusCode::BAD_GATEWAY, "COMMAND.DELIVERY_FAILED"),
    };
    (
        status,
        Json(ApiResponse::<()>::error(code, err.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::CommandAlias;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn envelope(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn not_found_body_uses_task_code() {
        let (status, body) = envelope(not_found_error()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["error"]["code"], "TASK.NOT_FOUND");
        assert_eq!(body["error"]["message"], "task not found");
    }

    #[tokio::test]
    async fn control_errors_map_to_status_and_code() {
        let cases = [
            (
                ControlError::MissingUid(CommandAlias::Execute),
                StatusCode::BAD_REQUEST,
                "INVALID.REQUEST",
            ),
            (
                ControlError::NotConnected("868204000728070".to_string()),
                StatusCode::CONFLICT,
                "DEVICE.OFFLINE",
            ),
            (
                ControlError::Unsupported("sms".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "COMMAND.UNSUPPORTED",
            ),
            (ControlError::Timeout(5000), StatusCode::BAD_GATEWAY, "COMMAND.DELIVERY_FAILED"),
        ];
        for (err, expected_status, expected_code) in cases {
            let message = err.to_string();
            let (status, body) = envelope(control_error(err)).await;
            assert_eq!(status, expected_status);
            assert_eq!(body["error"]["code"], expected_code);
            assert_eq!(body["error"]["message"], Value::String(message));
        }
    }
}
