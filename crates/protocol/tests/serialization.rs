use pretty_assertions::assert_eq;
use sl_protocol::*;

#[test]
fn test_execution_deserialization_from_backend_json() {
    // Shape returned by the execution endpoint, trimmed to the fields we read
    let json = r#"{
        "number": 12,
        "status": "running",
        "created": 1700000000000,
        "stages": [
            {
                "number": 1,
                "name": "build",
                "status": "running",
                "steps": [
                    {"number": 1, "name": "clone", "status": "success", "started": 1700000000000, "stopped": 1700000003000},
                    {"number": 2, "name": "compile", "status": "running", "started": 1700000003000},
                    {"number": 3, "name": "publish", "status": "pending"}
                ]
            }
        ]
    }"#;

    let execution: Execution = serde_json::from_str(json).expect("Failed to deserialize Execution");

    assert_eq!(execution.number, 12);
    assert_eq!(execution.status, ExecutionStatus::Running);

    let stage = execution.stage(1).expect("stage 1 should exist");
    assert_eq!(stage.steps.len(), 3);
    assert_eq!(stage.steps[0].status, ExecutionStatus::Success);
    assert_eq!(stage.steps[1].stopped, 0);
    assert_eq!(stage.steps[2].status, ExecutionStatus::Pending);
    assert!(execution.stage(2).is_none());
}

#[test]
fn test_execution_status_serialization() {
    let json = serde_json::to_value(ExecutionStatus::Failure).expect("Failed to serialize status");
    assert_eq!(json, "failure");

    let status: ExecutionStatus =
        serde_json::from_value(serde_json::json!("skipped")).expect("Failed to deserialize status");
    assert_eq!(status, ExecutionStatus::Skipped);
}

#[test]
fn test_unknown_status_is_rejected() {
    let result = serde_json::from_str::<ExecutionStatus>(r#""exploded""#);
    assert!(result.is_err());
}

#[test]
fn test_historical_log_array() {
    let json = r#"[
        {"pos": 0, "out": "+ cargo build\n", "time": 0},
        {"pos": 1, "out": "\u001b[32mFinished\u001b[0m\n", "time": 4}
    ]"#;

    let lines: Vec<LiveLogLine> = serde_json::from_str(json).expect("Failed to deserialize log lines");

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].out, "+ cargo build\n");
    assert_eq!(lines[1].pos, 1);
    assert!(lines[1].out.contains('\u{1b}'));
}

#[test]
fn test_global_config_defaults() {
    let config: GlobalConfig = serde_json::from_str("{}").expect("Failed to deserialize GlobalConfig");

    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.server, DEFAULT_SERVER);
    assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
}

#[test]
fn test_notification_serialization() {
    let notification = Notification::error("stream broke");

    let json = serde_json::to_value(&notification).expect("Failed to serialize Notification");

    assert_eq!(json["level"], "error");
    assert_eq!(json["message"], "stream broke");
    assert_eq!(json["id"], notification.id.to_string());
}
