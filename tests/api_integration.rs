//! Router-level tests with a mock agent.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;
use tempfile::TempDir;

use portfolio_insight::AppState;
use portfolio_insight::agent::{AgentError, AgentRequest, AgentRunner};
use portfolio_insight::config::{AppConfig, ResilienceConfig, ServerConfig, StorageConfig};
use portfolio_insight::server::{app, spawn_session_cleanup};
use portfolio_insight::session::SessionStore;

/// Agent double that records every request and replies with canned text.
#[derive(Debug, Default)]
struct MockAgent {
    requests: Mutex<Vec<AgentRequest>>,
}

#[async_trait]
impl AgentRunner for MockAgent {
    async fn run(&self, request: AgentRequest) -> Result<String, AgentError> {
        self.requests.lock().unwrap().push(request);
        Ok("## Mock Analysis\n\nLooks fine.".to_string())
    }
}

/// Agent double that always fails.
#[derive(Debug)]
struct FailingAgent;

#[async_trait]
impl AgentRunner for FailingAgent {
    async fn run(&self, _request: AgentRequest) -> Result<String, AgentError> {
        Err(AgentError::EmptyResponse)
    }
}

struct TestEnv {
    server: TestServer,
    agent: Arc<MockAgent>,
    upload_dir: std::path::PathBuf,
    // Held for cleanup on drop.
    _storage: TempDir,
}

fn build_server(agent: Arc<dyn AgentRunner>) -> (TestServer, std::path::PathBuf, TempDir) {
    let storage = TempDir::new().unwrap();
    let upload_dir = storage.path().join("uploads");
    let portfolio_dir = storage.path().join("portfolios");
    std::fs::create_dir_all(&upload_dir).unwrap();
    std::fs::create_dir_all(&portfolio_dir).unwrap();

    let config = Arc::new(AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".into(),
        },
        storage: StorageConfig {
            upload_dir: upload_dir.clone(),
            portfolio_dir,
        },
        resilience: ResilienceConfig {
            timeout_disabled: false,
        },
    });

    let state = AppState {
        agent,
        sessions: SessionStore::new(),
        config,
    };

    (TestServer::new(app(state)).unwrap(), upload_dir, storage)
}

fn setup() -> TestEnv {
    let agent = Arc::new(MockAgent::default());
    let (server, upload_dir, storage) = build_server(agent.clone());
    TestEnv {
        server,
        agent,
        upload_dir,
        _storage: storage,
    }
}

fn upload_form(filename: &str, bytes: &[u8], portfolio: Option<&str>) -> MultipartForm {
    let mut form = MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
    );
    if let Some(p) = portfolio {
        form = form.add_text("portfolio", p.to_string());
    }
    form
}

#[tokio::test]
async fn upload_document_and_portfolio() {
    let env = setup();

    let response = env
        .server
        .post("/api/upload")
        .multipart(upload_form(
            "report.xml",
            b"<root><a>Revenue up</a></root>",
            Some("sp500"),
        ))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "report.xml");
    assert!(!body["session_id"].as_str().unwrap().is_empty());
    assert!(env.upload_dir.join("report.xml").exists());
}

#[tokio::test]
async fn upload_rejects_bad_extension() {
    let env = setup();

    let response = env
        .server
        .post("/api/upload")
        .multipart(upload_form("malware.exe", b"MZ", None))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Invalid file type"));
}

#[tokio::test]
async fn upload_rejects_empty_request() {
    let env = setup();

    let response = env
        .server
        .post("/api/upload")
        .multipart(MultipartForm::new().add_text("session_id", ""))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn portfolio_only_selection_seeds_csv() {
    let env = setup();

    let response = env
        .server
        .post("/api/upload")
        .multipart(MultipartForm::new().add_text("portfolio", "nasdaq"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("NASDAQ portfolio selected")
    );
}

#[tokio::test]
async fn summarize_requires_document() {
    let env = setup();

    let response = env
        .server
        .post("/api/summarize")
        .json(&serde_json::json!({ "session_id": "nobody" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No financial document uploaded");
}

#[tokio::test]
async fn summarize_full_flow_converts_xml() {
    let env = setup();

    let upload: Value = env
        .server
        .post("/api/upload")
        .multipart(upload_form(
            "filing.xml",
            b"<filing><event>Rate cut announced</event></filing>",
            Some("sp500"),
        ))
        .await
        .json();
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    let response = env
        .server
        .post("/api/summarize")
        .json(&serde_json::json!({ "session_id": session_id, "message": "Focus on banks." }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["type"], "analysis");
    assert!(body["summary"].as_str().unwrap().contains("Mock Analysis"));

    // The XML was normalized to a text sibling before attachment.
    assert!(env.upload_dir.join("filing.txt").exists());
    let requests = env.agent.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].attachments.len(), 1);
    assert_eq!(requests[0].attachments[0].mime_type, "text/plain");
    assert!(requests[0].prompt.contains("SP500 Portfolio"));
    assert!(requests[0].prompt.contains("Focus on banks."));
}

#[tokio::test]
async fn chat_requires_message_and_keeps_history() {
    let env = setup();

    let upload: Value = env
        .server
        .post("/api/upload")
        .multipart(upload_form("notes.txt", b"Earnings beat.", Some("dowjones")))
        .await
        .json();
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    let empty = env
        .server
        .post("/api/chat")
        .json(&serde_json::json!({ "session_id": session_id }))
        .await;
    empty.assert_status(StatusCode::BAD_REQUEST);

    let first = env
        .server
        .post("/api/chat")
        .json(&serde_json::json!({ "session_id": session_id, "message": "Impact on JPM?" }))
        .await;
    first.assert_status_ok();

    let second = env
        .server
        .post("/api/chat")
        .json(&serde_json::json!({ "session_id": session_id, "message": "And on WMT?" }))
        .await;
    second.assert_status_ok();

    let requests = env.agent.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].history.is_empty());
    // Second call replays the first exchange (user prompt + model reply).
    assert_eq!(requests[1].history.len(), 2);
    assert!(requests[1].prompt.contains("And on WMT?"));
}

#[tokio::test]
async fn predefined_prompt_validates_type() {
    let env = setup();

    let upload: Value = env
        .server
        .post("/api/upload")
        .multipart(upload_form("notes.txt", b"Guidance cut.", Some("nasdaq")))
        .await
        .json();
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    let bad = env
        .server
        .post("/api/predefined_prompt")
        .json(&serde_json::json!({ "session_id": session_id, "type": "astrology" }))
        .await;
    bad.assert_status(StatusCode::BAD_REQUEST);

    let good = env
        .server
        .post("/api/predefined_prompt")
        .json(&serde_json::json!({ "session_id": session_id, "type": "forecast" }))
        .await;
    good.assert_status_ok();
    let body: Value = good.json();
    assert_eq!(body["type"], "predefined");

    let requests = env.agent.requests.lock().unwrap();
    assert!(requests[0].prompt.starts_with("## Future Projections & Forecasts"));
}

#[tokio::test]
async fn upload_personal_portfolio() {
    let env = setup();

    let response = env
        .server
        .post("/api/upload_portfolio")
        .multipart(upload_form("my holdings.csv", b"Ticker,Name\nAAPL,Apple\n", None))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["portfolio"], "personal-portfolio");
    assert_eq!(body["filename"], "my_holdings.csv");
    assert!(env.upload_dir.join("portfolio_my_holdings.csv").exists());
}

#[tokio::test]
async fn new_session_discards_state() {
    let env = setup();

    let upload: Value = env
        .server
        .post("/api/upload")
        .multipart(upload_form("notes.txt", b"text", Some("sp500")))
        .await
        .json();
    let old_id = upload["session_id"].as_str().unwrap().to_string();

    let response = env
        .server
        .post("/api/new_session")
        .json(&serde_json::json!({ "session_id": old_id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let new_id = body["session_id"].as_str().unwrap().to_string();
    assert_ne!(new_id, old_id);

    // The fresh session has no document.
    let summarize = env
        .server
        .post("/api/summarize")
        .json(&serde_json::json!({ "session_id": new_id }))
        .await;
    summarize.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agent_failure_maps_to_bad_gateway() {
    let (server, _upload_dir, _storage) = build_server(Arc::new(FailingAgent));

    let upload: Value = server
        .post("/api/upload")
        .multipart(upload_form("notes.txt", b"text", Some("sp500")))
        .await
        .json();
    let session_id = upload["session_id"].as_str().unwrap().to_string();

    let response = server
        .post("/api/summarize")
        .json(&serde_json::json!({ "session_id": session_id }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Analysis failed"));
}

#[tokio::test]
async fn cleanup_task_evicts_idle_sessions() {
    let sessions = SessionStore::new();
    let _session = sessions.create();
    assert_eq!(sessions.len(), 1);

    let handle = spawn_session_cleanup(
        sessions.clone(),
        std::time::Duration::from_millis(10),
        std::time::Duration::ZERO,
    );

    // Give the sweeper a few ticks to run.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(sessions.is_empty());
    handle.abort();
}

#[tokio::test]
async fn index_page_is_served() {
    let env = setup();

    let response = env.server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("Portfolio Insight"));
}
