use api_contract::{ApiResponse, TaskOutcomeDto};
use domain::CommandAlias;
use serde_json::json;

#[test]
fn success_envelope_wraps_task_outcome() {
    let outcome = TaskOutcomeDto {
        task_id: "42".to_string(),
        alias: CommandAlias::Configure,
        outcome: "formatted".to_string(),
        messages: vec!["COM3 1234,10.0.0.2,21300".to_string()],
        result: Some(r#"{"list":["COM3 1234,10.0.0.2,21300"]}"#.to_string()),
        reported: Some(true),
    };
    let value = serde_json::to_value(ApiResponse::success(outcome)).expect("serialize");
    assert_eq!(value["success"], true);
    assert!(value["error"].is_null());
    assert_eq!(value["data"]["taskId"], "42");
    assert_eq!(value["data"]["alias"], "configure");
    assert_eq!(value["data"]["reported"], true);
}

#[test]
fn task_not_found_envelope_shape() {
    let value = serde_json::to_value(ApiResponse::<()>::error("TASK.NOT_FOUND", "task not found"))
        .expect("serialize");
    assert_eq!(
        value,
        json!({
            "success": false,
            "data": null,
            "error": {"code": "TASK.NOT_FOUND", "message": "task not found"}
        })
    );
}

#[test]
fn offline_device_envelope_carries_error_message() {
    let value = serde_json::to_value(ApiResponse::<()>::error(
        "DEVICE.OFFLINE",
        "device not connected: 868204000728070",
    ))
    .expect("serialize");
    assert_eq!(value["success"], false);
    assert_eq!(value["error"]["code"], "DEVICE.OFFLINE");
    assert_eq!(value["error"]["message"], "device not connected: 868204000728070");
}
