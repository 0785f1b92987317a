//! End-to-end harness for the SuperNova console.
//!
//! Each test spawns the real admin router on an ephemeral port, wired to
//! in-process stand-ins for the user registry and the Gemini API, and drives
//! it over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p supernova-integration-tests
//! ```
//!
//! No network access or credentials are needed.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use supernova_admin::config::AdminConfig;
use supernova_admin::routes;
use supernova_admin::session::{FileSessionStore, SessionStore};
use supernova_admin::state::AppState;

/// Token the stub registry issues on every successful login.
pub const STUB_TOKEN: &str = "stub-registry-token";

/// API key the console is configured with.
pub const STUB_GEMINI_KEY: &str = "AIzaSyD3x9Kq7Lm2Np4Rt6Vw8Yz0Bc1Df3Gh5J";

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A registry user record as the wire format carries it.
#[must_use]
pub fn user_json(id: &str, name: &str, phone: &str, role: Option<&str>, created_at: DateTime<Utc>) -> Value {
    let mut user = json!({
        "_id": id,
        "name": name,
        "phone": phone,
        "isDeleted": false,
        "createdAt": created_at,
        "updatedAt": created_at,
    });
    if let Some(role) = role {
        user["role"] = json!(role);
    }
    user
}

// =============================================================================
// Registry stub
// =============================================================================

/// One recorded `update-user` call.
#[derive(Debug, Clone)]
pub struct RecordedUpdate {
    pub id: String,
    pub fields: Vec<(String, String)>,
    pub file_name: Option<String>,
}

#[derive(Default)]
struct RegistryState {
    accounts: Mutex<Vec<(String, String)>>,
    users: Mutex<Vec<Value>>,
    list_delay: Mutex<Duration>,
    list_calls: AtomicUsize,
    updates: Mutex<Vec<RecordedUpdate>>,
}

/// In-process user registry.
pub struct StubRegistry {
    state: Arc<RegistryState>,
    url: String,
}

impl StubRegistry {
    /// Start the registry with a user collection and no accounts.
    pub async fn start(users: Vec<Value>) -> Self {
        let state = Arc::new(RegistryState {
            users: Mutex::new(users),
            ..RegistryState::default()
        });

        let router = Router::new()
            .route("/api/v1/auth/login/", post(registry_login))
            .route("/api/v1/users/", get(registry_list))
            .route("/api/v1/users/update-user/{id}", patch(registry_update))
            .with_state(state.clone());

        let addr = serve(router).await;
        Self {
            state,
            url: format!("http://{addr}"),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Accept `password` for `phone`.
    pub fn add_account(&self, phone: &str, password: &str) {
        self.state
            .accounts
            .lock()
            .unwrap()
            .push((phone.to_string(), password.to_string()));
    }

    /// Delay every subsequent list response.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.state.list_delay.lock().unwrap() = delay;
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.state.updates.lock().unwrap().clone()
    }
}

async fn registry_login(
    State(state): State<Arc<RegistryState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let phone = body["phone"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let known = state
        .accounts
        .lock()
        .unwrap()
        .iter()
        .any(|(p, pw)| p == phone && pw == password);

    if known {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Login successful",
                "data": { "accessToken": STUB_TOKEN },
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        )
    }
}

async fn registry_list(
    State(state): State<Arc<RegistryState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.list_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let expected = format!("Bearer {STUB_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Unauthorized" })),
        );
    }

    let users = state.users.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Users fetched", "data": users })),
    )
}

async fn registry_update(
    State(state): State<Arc<RegistryState>>,
    UrlPath(id): UrlPath<String>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut fields = Vec::new();
    let mut file_name = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file_name = field.file_name().map(str::to_string);
            field.bytes().await.unwrap();
        } else {
            fields.push((name, field.text().await.unwrap()));
        }
    }

    state.updates.lock().unwrap().push(RecordedUpdate {
        id: id.clone(),
        fields: fields.clone(),
        file_name: file_name.clone(),
    });

    if let Some((_, website)) = fields.iter().find(|(k, _)| k == "website")
        && !website.starts_with("http")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Website must be a valid URL" })),
        );
    }

    let mut users = state.users.lock().unwrap();
    let Some(user) = users.iter_mut().find(|u| u["_id"] == id.as_str()) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "User not found" })),
        );
    };

    for (key, value) in fields {
        user[key] = json!(value);
    }
    if let Some(file_name) = file_name {
        user["image"] = json!(format!("https://cdn.example.test/{file_name}"));
    }
    user["updatedAt"] = json!(Utc::now());

    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "User updated", "data": user.clone() })),
    )
}

// =============================================================================
// Gemini stub
// =============================================================================

#[derive(Default)]
struct GeminiState {
    reply: Mutex<Option<String>>,
    requests: Mutex<Vec<Value>>,
}

/// In-process generative-text API.
pub struct StubGemini {
    state: Arc<GeminiState>,
    url: String,
}

impl StubGemini {
    /// Start the API. `None` makes every call fail with a 500.
    pub async fn start(reply: Option<&str>) -> Self {
        let state = Arc::new(GeminiState {
            reply: Mutex::new(reply.map(str::to_string)),
            requests: Mutex::default(),
        });

        let router = Router::new()
            .route("/v1beta/models/{action}", post(gemini_generate))
            .with_state(state.clone());

        let addr = serve(router).await;
        Self {
            state,
            url: format!("http://{addr}"),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request bodies received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn gemini_generate(
    State(state): State<Arc<GeminiState>>,
    UrlPath(action): UrlPath<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(body);

    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(STUB_GEMINI_KEY)
        || !action.ends_with(":generateContent")
    {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "Forbidden", "status": "PERMISSION_DENIED" } })),
        );
    }

    let reply = state.reply.lock().unwrap().clone();
    match reply {
        Some(text) => (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": text }] },
                    "finishReason": "STOP",
                }],
            })),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" } })),
        ),
    }
}

// =============================================================================
// Console under test
// =============================================================================

/// Scratch directory removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
    #[must_use]
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("supernova-it-{}", rand::random::<u64>()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Default for TempDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// A running console.
pub struct TestApp {
    pub client: reqwest::Client,
    url: String,
    session_dir: Arc<TempDir>,
}

impl TestApp {
    /// Spawn a console against the stubs with a fresh session file.
    pub async fn spawn(registry: &StubRegistry, gemini: &StubGemini) -> Self {
        Self::spawn_with(registry.url(), gemini.url(), 3000, Arc::new(TempDir::new())).await
    }

    /// Spawn a console with explicit collaborator URLs, cold-start
    /// threshold and session directory.
    pub async fn spawn_with(
        registry_url: &str,
        gemini_url: &str,
        cold_start_ms: u64,
        session_dir: Arc<TempDir>,
    ) -> Self {
        let session_path = session_dir.path().join("session.json");
        let cold_start_ms = cold_start_ms.to_string();
        let config = AdminConfig::from_vars([
            ("GEMINI_API_KEY", STUB_GEMINI_KEY),
            ("GEMINI_API_URL", gemini_url),
            ("REGISTRY_API_URL", registry_url),
            ("REGISTRY_COLD_START_MS", cold_start_ms.as_str()),
            ("ADMIN_SESSION_PATH", session_path.to_str().unwrap()),
        ])
        .unwrap();

        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(session_path));
        let state = AppState::new(config, store).unwrap();
        let addr = serve(routes::routes().with_state(state)).await;

        Self {
            client: reqwest::Client::new(),
            url: format!("http://{addr}"),
            session_dir,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    /// The directory holding this console's session file.
    #[must_use]
    pub fn session_dir(&self) -> Arc<TempDir> {
        self.session_dir.clone()
    }

    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.session_dir.path().join("session.json")
    }

    pub async fn login(&self, phone: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "phone": phone, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }
}
