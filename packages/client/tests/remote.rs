use std::time::Duration;

use isoresource_client::{ClientConfig, RemoteClient, RemoteError, RemoteProxy, ReqwestExecutor};
use isoresource_core::{ResourceManifest, ResourceProxy, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manifest() -> ResourceManifest {
    serde_json::from_value(json!({
        "name": "tasks",
        "path": "/tasks",
        "actions": [
            {
                "action": "index",
                "path": "/",
                "method": "GET",
                "schema": {
                    "type": "object",
                    "fields": {
                        "done": { "type": "optional", "inner": { "type": "boolean" } }
                    }
                }
            },
            {
                "action": "create",
                "path": "/",
                "method": "POST",
                "schema": {
                    "type": "object",
                    "fields": { "title": { "type": "string" } }
                }
            },
            {
                "action": "show",
                "path": "/$id",
                "method": "GET",
                "schema": {
                    "type": "object",
                    "fields": { "id": { "type": "integer" } }
                }
            }
        ]
    }))
    .unwrap()
}

async fn tasks(server: &MockServer) -> RemoteProxy<ReqwestExecutor> {
    let config = ClientConfig::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_secs(5));
    RemoteClient::new(config).unwrap().proxy(&manifest()).unwrap()
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Task {
    id: i64,
    title: String,
}

#[tokio::test]
async fn get_sends_query_and_unwraps_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(query_param("done", "true"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [{ "id": 1, "title": "ship" }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = tasks(&server)
        .await
        .call("index", Some(Value::object([("done", Value::Bool(true))])))
        .await
        .unwrap();
    assert_eq!(output.as_array().map(<[Value]>::len), Some(1));
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(body_json(json!({ "title": "ship" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "id": 9, "title": "ship" },
        })))
        .mount(&server)
        .await;

    #[derive(Serialize)]
    struct NewTask<'a> {
        title: &'a str,
    }

    let task: Task = tasks(&server)
        .await
        .call_as("create", &NewTask { title: "ship" })
        .await
        .unwrap();
    assert_eq!(
        task,
        Task {
            id: 9,
            title: "ship".to_string()
        }
    );
}

#[tokio::test]
async fn path_params_are_substituted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "id": 42, "title": "answer" },
        })))
        .mount(&server)
        .await;

    let output = tasks(&server)
        .await
        .call("show", Some(Value::object([("id", Value::from(42i64))])))
        .await
        .unwrap();
    assert_eq!(output.get("title"), Some(&Value::from("answer")));
}

#[tokio::test]
async fn server_validation_errors_come_back_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "status": "error",
            "errors": [{ "code": "custom", "path": ["title"], "message": "already exists" }],
            "message": "title: already exists",
        })))
        .mount(&server)
        .await;

    let error = tasks(&server)
        .await
        .call("create", Some(Value::object([("title", Value::from("dup"))])))
        .await
        .unwrap_err();
    let validation = error.validation().unwrap();
    assert_eq!(validation.issues.len(), 1);
    assert_eq!(validation.issues[0].dotted_path(), "title");
}

#[tokio::test]
async fn local_validation_skips_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let error = tasks(&server)
        .await
        .call("show", Some(Value::object([("id", Value::from("abc"))])))
        .await
        .unwrap_err();
    assert!(matches!(error, RemoteError::Validation(_)));
}

#[tokio::test]
async fn fatal_envelope_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "fatal",
            "message": "Internal Server Error",
        })))
        .mount(&server)
        .await;

    let error = tasks(&server).await.call("index", None).await.unwrap_err();
    match error {
        RemoteError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let config = ClientConfig::new("http://127.0.0.1:1")
        .unwrap()
        .with_timeout(Duration::from_millis(500));
    let proxy = RemoteClient::new(config).unwrap().proxy(&manifest()).unwrap();
    let error = proxy.call("index", None).await.unwrap_err();
    assert!(matches!(error, RemoteError::Transport(_)));
}
