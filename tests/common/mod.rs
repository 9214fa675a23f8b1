// Shared helpers for the integration tests: a mock Pipedream REST API and
// a runner for the built binary
#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::path::Path as FsPath;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "test-key";

/// API key whose `GET /v1/users/me` never gets an answer
pub const HANG_KEY: &str = "hang-key";

/// Workflow name that makes the mock answer `POST /workflows` without an id
pub const NAME_WITHOUT_ID: &str = "no-id";

/// Environment variables the binary reads; cleared for every run
const AMBIENT_VARS: &[&str] = &[
    "PIPEDREAM_API_KEY",
    "PIPEDREAM_USERNAME",
    "PIPEDREAM_PASSWORD",
    "PIPEDREAM_ORG_ID",
    "PROJECT_ID",
    "DEFAULT_TRIGGER_TYPE",
    "DEFAULT_SCHEDULE",
    "PIPEPROBE_API_BASE",
    "PIPEPROBE_WEB_BASE",
    "PIPEPROBE_WEBHOOK_BASE",
    "RUST_LOG",
];

#[derive(Clone, Default)]
struct MockState {
    created: Arc<Mutex<Vec<Value>>>,
    hung: Arc<AtomicUsize>,
}

/// A mock of the REST API on a random local port, served from its own
/// runtime on a background thread
pub struct MockApi {
    pub base_url: String,
    state: MockState,
}

impl MockApi {
    pub fn start() -> MockApi {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let state = MockState::default();
        let app = create_app(state.clone());
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        MockApi {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Bodies received by `POST /v1/workflows`, oldest first
    pub fn created_requests(&self) -> Vec<Value> {
        self.state.created.lock().unwrap().clone()
    }

    /// Requests made with [`HANG_KEY`] that are still waiting
    pub fn hung_requests(&self) -> usize {
        self.state.hung.load(Ordering::SeqCst)
    }
}

fn create_app(state: MockState) -> Router {
    Router::new()
        .route("/v1/users/me", get(users_me))
        .route("/v1/workflows", post(create_workflow))
        .route("/v1/workflows/:id", get(get_workflow))
        .route("/v1/projects/:id/workflows", get(project_workflows))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {API_KEY}"))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "invalid api key" })),
    )
}

async fn users_me(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let hang = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {HANG_KEY}"));
    if hang {
        state.hung.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": {
                "id": "u_test",
                "email": "me@example.com",
                "orgs": [
                    { "id": "o_first", "name": "First" },
                    { "id": "o_second", "name": "Second" }
                ]
            }
        })),
    )
}

async fn create_workflow(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    let without_id = body["settings"]["name"] == NAME_WITHOUT_ID;
    state.created.lock().unwrap().push(body);

    if without_id {
        return (StatusCode::OK, Json(json!({ "data": {} })));
    }
    (StatusCode::OK, Json(json!({ "data": { "id": "p_wf123" } })))
}

async fn get_workflow(Path(id): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != "p_wf123" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "workflow not found" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": {
                "id": "p_wf123",
                "name": "Orders",
                "components": [
                    {
                        "key": "trigger",
                        "type": "source",
                        "app": "http",
                        "source": {
                            "type": "webhook",
                            "name": "Orders HTTP Webhook",
                            "key": "http-webhook"
                        }
                    },
                    {
                        "key": "send_slack",
                        "type": "action",
                        "app": "slack",
                        "name": "Send to Slack",
                        "options": { "channel": "#orders" }
                    }
                ]
            }
        })),
    )
}

async fn project_workflows(
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": [
                { "id": "p_wf123", "name": format!("Orders in {id}") },
                { "id": "p_wf456" }
            ]
        })),
    )
}

/// Run the binary in `dir` with a clean environment plus `envs`.
///
/// Returns the parsed stdout JSON (or an error object built from the raw
/// output) and the exit code.
pub fn run_command(args: &[&str], dir: &FsPath, envs: &[(&str, &str)]) -> (Value, i32) {
    let output = command(args, dir, envs).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let exit_code = output.status.code().unwrap_or(-1);

    let json = serde_json::from_str(&stdout).unwrap_or_else(|_| {
        let message = if !stdout.is_empty() {
            stdout.to_string()
        } else {
            stderr.to_string()
        };
        json!({
            "error": exit_code != 0,
            "message": message,
            "exit_code": exit_code
        })
    });
    (json, exit_code)
}

/// The binary, set up to run in `dir` with a clean environment plus `envs`
pub fn command(args: &[&str], dir: &FsPath, envs: &[(&str, &str)]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pipeprobe"));
    command.args(args).current_dir(dir);
    for var in AMBIENT_VARS {
        command.env_remove(var);
    }
    // Keep the user-level config.ini out of reach
    command
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"));
    for (key, value) in envs {
        command.env(key, value);
    }
    command
}

/// `config.ini` for a project directory
pub fn write_project_config(dir: &FsPath, project_id: &str) {
    std::fs::write(
        dir.join("config.ini"),
        format!("[project]\nname=demo\nid={project_id}\n"),
    )
    .unwrap();
}
