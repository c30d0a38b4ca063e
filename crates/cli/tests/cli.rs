#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

const EXECUTION_PATH: &str = "/api/v1/repos/space/repo/+/pipelines/ci/executions/7";

fn steplog() -> Command {
    let mut cmd = Command::cargo_bin("steplog").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

fn execution(status: &str) -> serde_json::Value {
    json!({
        "number": 7,
        "status": status,
        "stages": [{
            "number": 1,
            "name": "default",
            "status": status,
            "steps": [{"number": 1, "name": "test", "status": status}]
        }]
    })
}

fn fast_config() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "poll_interval_ms = 50\nframe_interval_ms = 5").unwrap();
    file
}

#[test]
fn render_strips_colors() {
    steplog()
        .arg("render")
        .write_stdin("\u{1b}[1;32mok\u{1b}[0m done\n")
        .assert()
        .success()
        .stdout("ok done\n");
}

#[test]
fn render_html_escapes_markup() {
    steplog()
        .args(["render", "--html"])
        .write_stdin("<script>alert(1)</script>\n\u{1b}[31mred\u{1b}[0m\n")
        .assert()
        .success()
        .stdout(
            contains("&lt;script&gt;alert(1)&lt;/script&gt;")
                .and(contains("<span style=\"color:rgb(187, 0, 0)\">red</span>"))
                .and(contains("<script>").not()),
        );
}

#[test]
fn rejects_invalid_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "server = [oops").unwrap();

    steplog()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["logs", "space/repo", "ci", "7", "1", "1"])
        .assert()
        .failure()
        .stderr(contains("Failed to parse TOML"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logs_prints_finished_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("failure")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{EXECUTION_PATH}/logs/1/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"pos": 0, "out": "running tests\n", "time": 0},
            {"pos": 1, "out": "\u{1b}[31m1 failed\u{1b}[0m\n", "time": 1}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let output = steplog()
        .args(["--server", &server.uri()])
        .args(["logs", "space/repo", "ci", "7", "1", "1"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap().lines().collect::<Vec<_>>(),
        vec!["running tests", "1 failed"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logs_reports_missing_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("success")))
        .mount(&server)
        .await;

    steplog()
        .args(["--server", &server.uri()])
        .args(["logs", "space/repo", "ci", "7", "1", "9"])
        .assert()
        .failure()
        .stderr(contains("No such step"));
}

async fn mount_step_logs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{EXECUTION_PATH}/logs/1/1/stream")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"pos\":0,\"out\":\"step one\\n\"}\n\n\
             data: {\"pos\":1,\"out\":\"step two\\n\"}\n\n\
             event: error\ndata: eof\n\n",
            "text/event-stream",
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{EXECUTION_PATH}/logs/1/1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"pos": 0, "out": "step one\n", "time": 0},
            {"pos": 1, "out": "step two\n", "time": 1}
        ])))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logs_follow_waits_for_pending_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("pending")))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("running")))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("success")))
        .mount(&server)
        .await;
    mount_step_logs(&server).await;

    let config = fast_config();
    steplog()
        .args(["--config", config.path().to_str().unwrap()])
        .args(["--server", &server.uri()])
        .args(["logs", "space/repo", "ci", "7", "1", "1", "--follow"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(contains("step one").and(contains("step two")));

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|request| request.url.path()).collect();
    assert_eq!(
        paths
            .iter()
            .filter(|path| **path == format!("{EXECUTION_PATH}/logs/1/1/stream"))
            .count(),
        1,
        "{paths:?}"
    );
    assert!(paths.iter().filter(|path| **path == EXECUTION_PATH).count() >= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logs_follow_streams_until_step_finishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("running")))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EXECUTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(execution("success")))
        .mount(&server)
        .await;
    mount_step_logs(&server).await;

    let config = fast_config();
    steplog()
        .args(["--config", config.path().to_str().unwrap()])
        .args(["--server", &server.uri()])
        .args(["logs", "space/repo", "ci", "7", "1", "1", "--follow"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(contains("step one").and(contains("step two")));
}
