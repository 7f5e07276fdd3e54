//! In-process mock of the task backend for HTTP-level tests.
//!
//! Binds an axum router on `127.0.0.1:0` and exposes its state so tests can
//! flip failure modes and inspect what the client sent.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use serde_json::{Value, json};

use crate::config::{ClientConfig, Timeouts};

pub(crate) const PASSWORD: &str = "secret";
pub(crate) const BEARER: &str = "tok-1";
pub(crate) const COOKIE: &str = "jwt=cookie-1";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthMode {
    /// Login returns `{token}` in the body.
    Bearer,
    /// Login sets an HTTP-only cookie and returns no body.
    Cookie,
}

pub(crate) struct MockState {
    pub mode: AuthMode,
    pub admin: AtomicBool,
    pub fail_logout: AtomicBool,
    pub me_delay_ms: AtomicU64,
    pub me_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub name: Mutex<String>,
    pub last_query: Mutex<Option<String>>,
    pub last_body: Mutex<Option<Value>>,
}

impl MockState {
    fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            admin: AtomicBool::new(false),
            fail_logout: AtomicBool::new(false),
            me_delay_ms: AtomicU64::new(0),
            me_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            name: Mutex::new("Ann".to_owned()),
            last_query: Mutex::new(None),
            last_body: Mutex::new(None),
        }
    }

    fn user_json(&self) -> Value {
        let mut roles = vec!["ROLE_USER"];
        if self.admin.load(Ordering::SeqCst) {
            roles.push("ROLE_ADMIN");
        }
        json!({
            "id": "8a1f6c2e-0000-4000-8000-000000000001",
            "name": self.name.lock().unwrap().clone(),
            "email": "a@x.com",
            "profileImage": "",
            "roles": roles,
            "authProvider": "LOCAL"
        })
    }
}

pub(crate) struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub(crate) async fn start(mode: AuthMode) -> Self {
        let state = Arc::new(MockState::new(mode));
        let router = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), state }
    }

    pub(crate) fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url).unwrap()
    }

    pub(crate) fn config_with_timeout(&self, request_secs: u64) -> ClientConfig {
        let mut config = self.config();
        config.timeouts = Timeouts { request_secs, connect_secs: 1 };
        config
    }
}

/// A base URL nothing listens on.
pub(crate) async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/auth/me/password", put(change_password))
        .route("/users/me", delete(delete_me))
        .route("/users/me/name", put(rename))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/filter", get(list_tasks))
        .route("/tasks/sort", get(list_tasks))
        .route("/tasks/{id}/status", put(set_status))
        .route("/tasks/{id}", delete(delete_task))
        .route("/admin/users", get(admin_users))
        .route("/admin/users/{id}", delete(admin_delete_user))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {BEARER}"));
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(';').any(|c| c.trim() == COOKIE));
    bearer || cookie
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized", "status": false }))).into_response()
}

fn task_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": "Write report",
        "description": "quarterly",
        "status": status,
        "dueDate": "2024-05-01T00:00:00",
        "userId": "8a1f6c2e-0000-4000-8000-000000000001"
    })
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body.get("password").and_then(Value::as_str) != Some(PASSWORD) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials", "status": false })))
            .into_response();
    }
    match state.mode {
        AuthMode::Bearer => Json(json!({ "token": BEARER, "email": body["email"] })).into_response(),
        AuthMode::Cookie => {
            ([(header::SET_COOKIE, format!("{COOKIE}; Path=/; HttpOnly"))], StatusCode::OK).into_response()
        }
    }
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.me_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(state.user_json()).into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    (
        [(header::SET_COOKIE, "jwt=; Path=/; Max-Age=0")],
        Json(json!({ "message": "User logged out successfully", "status": true })),
    )
        .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body.get("email").and_then(Value::as_str) == Some("taken@x.com") {
        return (StatusCode::CONFLICT, Json(json!({ "message": "Email already in use" }))).into_response();
    }
    Json(json!({ "message": "User registered successfully" })).into_response()
}

async fn change_password(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body.get("oldPassword").and_then(Value::as_str) != Some(PASSWORD) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Old password is incorrect" }))).into_response();
    }
    StatusCode::OK.into_response()
}

async fn delete_me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn rename(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
    *state.name.lock().unwrap() = name.to_owned();
    Json(state.user_json()).into_response()
}

async fn list_tasks(State(state): State<Arc<MockState>>, headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    *state.last_query.lock().unwrap() = query;
    Json(json!([task_json("t-1", "PENDING"), task_json("t-2", "COMPLETED")])).into_response()
}

async fn create_task(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut task = task_json("t-new", "PENDING");
    task["title"] = body["title"].clone();
    *state.last_body.lock().unwrap() = Some(body);
    Json(task).into_response()
}

async fn set_status(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let status = body["status"].as_str().unwrap_or("PENDING").to_owned();
    *state.last_body.lock().unwrap() = Some(body);
    Json(task_json(&id, &status)).into_response()
}

async fn delete_task(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Task not found" }))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn admin_users(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([state.user_json(), {
        "id": "8a1f6c2e-0000-4000-8000-000000000002",
        "name": "Bob",
        "email": "b@x.com",
        "roles": ["ROLE_USER"],
        "authProvider": "GOOGLE"
    }]))
    .into_response()
}

async fn admin_delete_user(headers: HeaderMap, Path(_id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}
