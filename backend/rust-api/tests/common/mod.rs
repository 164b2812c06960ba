#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use codedrill_api::config::Config;
use codedrill_api::create_router;
use codedrill_api::models::execution::{ExecutionRequest, ExecutionResult};
use codedrill_api::models::problem::ProblemSpec;
use codedrill_api::models::submission::{FinalizeResponse, SubmissionRecord};
use codedrill_api::models::AssistMode;
use codedrill_api::services::assist_service::AssistBackend;
use codedrill_api::services::content_service::ContentProvider;
use codedrill_api::services::execution_client::ExecutionBackend;
use codedrill_api::services::submission_service::GradingBackend;
use codedrill_api::services::AppState;

/// Content fake seeded with a couple of fixed problems.
pub struct FakeContent {
    problems: HashMap<String, ProblemSpec>,
}

impl FakeContent {
    pub fn seeded() -> Arc<Self> {
        let mut problems = HashMap::new();

        let two_sum: ProblemSpec = serde_json::from_value(serde_json::json!({
            "id": "two-sum",
            "prompt": "Read two comma-separated integers and print their sum.",
            "default_source": { "python": "print(sum(map(int, input().split(','))))" },
            "test_cases": [
                { "id": "t1", "input": "3,4", "expected_output": "7" },
                { "id": "t2", "input": "10, 20", "expected_output": "30" },
                { "id": "t3", "input": "5,5", "expected_output": "10", "hidden": true },
            ],
            "hints": [
                { "content": "Split the input on the comma." },
                { "kind": "video", "content": "https://videos.test/two-sum-walkthrough" },
            ],
            "time_limit_seconds": 60
        }))
        .unwrap();
        problems.insert("two-sum".to_string(), two_sum.sanitize("two-sum"));

        let empty: ProblemSpec = serde_json::from_value(serde_json::json!({
            "id": "empty-problem",
            "prompt": "A problem with no test cases yet."
        }))
        .unwrap();
        problems.insert(
            "empty-problem".to_string(),
            empty.sanitize("empty-problem"),
        );

        Arc::new(Self { problems })
    }
}

#[async_trait]
impl ContentProvider for FakeContent {
    async fn fetch_problem(&self, problem_id: &str) -> anyhow::Result<ProblemSpec> {
        self.problems
            .get(problem_id)
            .cloned()
            .ok_or_else(|| anyhow!("Problem not found: {}", problem_id))
    }
}

/// Execution fake: scripted results keyed by stdin, echoing unscripted input.
pub struct FakeExecution {
    by_stdin: Mutex<HashMap<String, ExecutionResult>>,
}

impl FakeExecution {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            by_stdin: Mutex::new(HashMap::new()),
        })
    }

    pub fn script(&self, stdin: &str, result: ExecutionResult) {
        self.by_stdin
            .lock()
            .unwrap()
            .insert(stdin.to_string(), result);
    }
}

#[async_trait]
impl ExecutionBackend for FakeExecution {
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.by_stdin
            .lock()
            .unwrap()
            .get(&request.stdin)
            .cloned()
            .unwrap_or_else(|| ExecutionResult::ok(request.stdin.clone()))
    }
}

pub struct FakeAssist;

#[async_trait]
impl AssistBackend for FakeAssist {
    async fn request_assist(
        &self,
        _problem_prompt: &str,
        _learner_source: &str,
        _mode: AssistMode,
    ) -> anyhow::Result<String> {
        Ok("Consider the edge cases first.".to_string())
    }
}

/// Grading fake recording every finalize call; can be switched to fail.
pub struct FakeGrading {
    pub calls: Mutex<Vec<SubmissionRecord>>,
    pub fail: AtomicBool,
}

impl FakeGrading {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GradingBackend for FakeGrading {
    async fn finalize(&self, record: &SubmissionRecord) -> anyhow::Result<FinalizeResponse> {
        self.calls.lock().unwrap().push(record.clone());
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(anyhow!("grading service unreachable"));
        }
        Ok(FinalizeResponse {
            accepted: true,
            reason: None,
        })
    }
}

pub struct TestHandles {
    pub execution: Arc<FakeExecution>,
    pub grading: Arc<FakeGrading>,
}

fn test_config() -> Config {
    Config {
        execution_api_url: "http://execution.test".to_string(),
        content_api_url: "http://content.test".to_string(),
        assist_api_url: "http://assist.test".to_string(),
        grading_api_url: "http://grading.test".to_string(),
        execution_timeout_seconds: 5,
        hint_unlock_interval_seconds: 300,
        assist_unlock_delay_seconds: 420,
        default_time_limit_seconds: 3600,
    }
}

pub async fn create_test_app() -> (Router, TestHandles) {
    create_test_app_with(|_| {}).await
}

/// Builds the app exactly as main does, with in-memory collaborator fakes
/// instead of the HTTP backends.
pub async fn create_test_app_with<F: FnOnce(&mut Config)>(configure: F) -> (Router, TestHandles) {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let mut config = test_config();
    configure(&mut config);

    let execution = FakeExecution::new();
    let grading = FakeGrading::new();

    let app_state = Arc::new(AppState::with_backends(
        config,
        execution.clone(),
        FakeContent::seeded(),
        Arc::new(FakeAssist),
        grading.clone(),
    ));

    (
        create_router(app_state),
        TestHandles { execution, grading },
    )
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::String(
            String::from_utf8_lossy(&bytes).to_string(),
        ))
    };
    (status, json)
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::String(
            String::from_utf8_lossy(&bytes).to_string(),
        ))
    };
    (status, json)
}

/// Creates a session for the given problem/mode and returns its id.
pub async fn create_session(app: &Router, problem_id: &str, mode: &str) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/sessions/",
        serde_json::json!({
            "user_id": "learner-1",
            "problem_id": problem_id,
            "mode": mode,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
    json["session_id"].as_str().unwrap().to_string()
}

pub async fn start_session(app: &Router, session_id: &str) -> serde_json::Value {
    let (status, json) = post_json(
        app,
        &format!("/api/v1/sessions/{}/start", session_id),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start failed: {}", json);
    json
}
