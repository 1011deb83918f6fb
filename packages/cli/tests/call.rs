use std::io::Write;

use clap::Parser;
use isoresource_cli::{run, Cli, CliError};
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manifest_file() -> NamedTempFile {
    let manifests = json!([
        {
            "name": "tasks",
            "path": "/tasks",
            "actions": [
                {
                    "action": "create",
                    "path": "/",
                    "method": "POST",
                    "schema": {
                        "type": "object",
                        "fields": {
                            "title": { "type": "string", "bounds": { "min": 1.0 } },
                            "points": { "type": "optional", "inner": { "type": "integer" } }
                        }
                    }
                },
                {
                    "action": "show",
                    "path": "/$id",
                    "method": "GET",
                    "schema": { "type": "object", "fields": { "id": { "type": "integer" } } }
                }
            ]
        },
        { "name": "health", "path": "/health", "actions": [
            { "action": "ping", "path": "/", "method": "GET", "schema": { "type": "blank" } }
        ] }
    ]);
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", manifests).unwrap();
    file
}

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("isoresource").chain(args.iter().copied())).unwrap()
}

#[tokio::test]
async fn call_posts_cast_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("x-token", "secret"))
        .and(body_json(json!({ "title": "ship", "points": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "id": 1 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = manifest_file();
    let manifest = file.path().to_str().unwrap();
    let output = run(cli(&[
        "call", "-m", manifest, "-r", "tasks", "--base-url", &server.uri(), "-H", "X-Token: secret",
        "create", "-f", "title=ship", "-f", "points=3",
    ]))
    .await
    .unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&output).unwrap(), json!({ "id": 1 }));
}

#[tokio::test]
async fn blank_action_prints_nothing_without_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .mount(&server)
        .await;

    let file = manifest_file();
    let output = run(cli(&[
        "call", "-m", file.path().to_str().unwrap(), "-r", "health", "--base-url", &server.uri(), "ping",
    ]))
    .await
    .unwrap();
    assert!(output.is_empty());
}

#[tokio::test]
async fn invalid_input_exits_with_two() {
    let file = manifest_file();
    let error = run(cli(&[
        "call", "-m", file.path().to_str().unwrap(), "-r", "tasks", "--base-url", "http://127.0.0.1:1",
        "create", "--input", r#"{"title": ""}"#,
    ]))
    .await
    .unwrap_err();
    assert_eq!(error.exit_code(), 2);
}

#[tokio::test]
async fn several_resources_need_a_name() {
    let file = manifest_file();
    let error = run(cli(&["actions", "-m", file.path().to_str().unwrap()]))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::AmbiguousResource(ref names) if names == "tasks, health"));
}

#[tokio::test]
async fn routes_in_brace_style() {
    let file = manifest_file();
    let output = run(cli(&["routes", "-m", file.path().to_str().unwrap(), "--style", "braces"]))
        .await
        .unwrap();
    assert_eq!(output, "POST /tasks\nGET /tasks/{id}\nGET /health");
}

#[tokio::test]
async fn missing_manifest_file() {
    let error = run(cli(&["actions", "-m", "/nonexistent/manifest.json"]))
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Io { .. }));
}
