#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use tutor_backend_rust::db::config::DbConfig;
use tutor_backend_rust::db::Database;
use tutor_backend_rust::services::llm_provider::{LLMConfig, LLMProvider};
use tutor_backend_rust::services::tutor::Tutor;
use tutor_backend_rust::state::AppState;

pub const OPENING_LINE: &str = "Welcome to the airport! Where are you flying today?";
pub const FAKE_MP3: &[u8] = b"ID3\x03fake-mp3-frames";

/// Requests the fake provider has seen, in arrival order.
#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<Value>>>);

impl Recorded {
    pub fn all(&self) -> Vec<Value> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn push(&self, value: Value) {
        if let Ok(mut guard) = self.0.lock() {
            guard.push(value);
        }
    }
}

fn chat_completion(model: &str, content: &str) -> Response {
    Json(json!({
        "model": model,
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    }))
    .into_response()
}

fn messages(body: &Value) -> Vec<(String, String)> {
    body["messages"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|m| {
                    (
                        m["role"].as_str().unwrap_or_default().to_string(),
                        m["content"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn fake_chat(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Response {
    recorded.push(body.clone());

    let model = body["model"].as_str().unwrap_or("unknown").to_string();
    let msgs = messages(&body);
    let system = msgs.first().map(|(_, c)| c.clone()).unwrap_or_default();
    let last_user = msgs
        .iter()
        .rev()
        .find(|(role, _)| role == "user")
        .map(|(_, c)| c.clone())
        .unwrap_or_default();
    let json_mode = body["response_format"]["type"] == "json_object";

    if json_mode && system.contains("significant words") {
        return chat_completion(
            &model,
            r#"{"words": [{"word": "luggage", "translation": "zavazadla"}, {"word": "gate", "translation": "brána"}]}"#,
        );
    }

    if json_mode {
        let analysis = if last_user.contains("goed") {
            json!({
                "hasMistakes": true,
                "mistakes": [
                    { "original": "I goed", "corrected": "I went", "type": "grammar", "explanation": "Nepravidelné sloveso." },
                    { "original": "Airport", "corrected": "airport", "type": "spelling", "explanation": "Jen velikost písmen." }
                ]
            })
        } else {
            json!({ "hasMistakes": false, "mistakes": [] })
        };
        return chat_completion(&model, &analysis.to_string());
    }

    if system.contains("translator") {
        let translation = if system.contains("sentence") {
            "  Kde je moje brána?  "
        } else {
            " zavazadla\n"
        };
        return chat_completion(&model, translation);
    }

    if system.contains("summarizing") {
        return chat_completion(&model, "Great work today! Watch your irregular verbs.");
    }

    if msgs.len() == 2 && last_user.starts_with("Start the conversation") {
        return chat_completion(&model, OPENING_LINE);
    }

    let corrected = msgs
        .iter()
        .any(|(role, c)| role == "system" && c.contains("The student made these mistakes"));
    let turns = msgs.iter().filter(|(role, _)| role != "system").count();
    let reply = if corrected {
        format!("Oh, you went there? Tell me more. (turn {turns})")
    } else {
        format!("That sounds great. What happens next? (turn {turns})")
    };
    chat_completion(&model, &reply)
}

async fn fake_speech(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Response {
    recorded.push(body);
    ([(header::CONTENT_TYPE, "audio/mpeg")], FAKE_MP3).into_response()
}

/// Starts an OpenAI-compatible stand-in on an ephemeral port.
pub async fn spawn_fake_llm() -> (SocketAddr, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(fake_chat))
        .route("/v1/audio/speech", post(fake_speech))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake llm");
    let addr = listener.local_addr().expect("fake llm addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, recorded)
}

pub fn tutor_for(endpoint: &str) -> Tutor {
    let config = LLMConfig::new(Some("test-key".to_string()), endpoint)
        .with_timeout(std::time::Duration::from_secs(5));
    Tutor::new(LLMProvider::new(config), "Czech")
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub llm: Recorded,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let (addr, llm) = spawn_fake_llm().await;
        Self::with_tutor(tutor_for(&format!("http://{addr}")), llm).await
    }

    /// App whose provider endpoint refuses connections.
    pub async fn with_unreachable_llm() -> Self {
        Self::with_tutor(tutor_for("http://127.0.0.1:1"), Recorded::default()).await
    }

    async fn with_tutor(tutor: Tutor, llm: Recorded) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db = Database::connect(&DbConfig::for_path(dir.path().join("tutor.db")))
            .await
            .expect("open test database");
        let db = Arc::new(db);
        let state = AppState::new(Some(Arc::clone(&db)), Arc::new(tutor));

        Self {
            router: tutor_backend_rust::build_app(state),
            db,
            llm,
            _dir: dir,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    pub async fn post_raw(&self, uri: &str, body: Value) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Starts a lesson and returns its session id.
    pub async fn start_lesson(&self, username: &str, level: &str) -> String {
        let (status, body) = self
            .post(
                "/api/session/start",
                json!({ "level": level, "scenario": "airport", "username": username }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "start failed: {body}");
        body["sessionId"].as_str().expect("sessionId").to_string()
    }
}

/// App without a database, as when the SQLite file cannot be opened.
pub fn app_without_db() -> Router {
    let state = AppState::new(None, Arc::new(tutor_for("http://127.0.0.1:1")));
    tutor_backend_rust::build_app(state)
}
