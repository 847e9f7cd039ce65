//! # In-process DHIS2 API fake
//!
//! Serves the four endpoints the harness calls, with just enough behaviour to
//! check request shapes, status expectations and the ordering invariant: the
//! metadata import only succeeds once an org unit is assigned to a known user
//! and at least one org unit level exists.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

use dhis2_harness::config::ApiConfig;

pub const KNOWN_USER: &str = "M5zQapPyTZI";

#[derive(Debug, Clone)]
pub struct FakeOptions {
    pub username: String,
    pub password: String,
    /// Answer org unit creation without `response.uid`
    pub omit_uid: bool,
}

impl Default for FakeOptions {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            username: api.username,
            password: api.password,
            omit_uid: false,
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    org_units: HashMap<String, Value>,
    user_org_units: HashMap<String, Vec<String>>,
    levels: Vec<Value>,
    import_queries: Vec<HashMap<String, String>>,
    calls: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    expected_auth: String,
    options: FakeOptions,
    inner: Arc<Mutex<FakeState>>,
}

pub struct FakeDhis2 {
    base_url: String,
    options: FakeOptions,
    state: Arc<Mutex<FakeState>>,
    handle: JoinHandle<()>,
}

impl FakeDhis2 {
    pub async fn start() -> Self {
        Self::start_with(FakeOptions::default()).await
    }

    pub async fn start_with(options: FakeOptions) -> Self {
        let inner = Arc::new(Mutex::new(FakeState::default()));
        let credentials = format!("{}:{}", options.username, options.password);
        let app_state = AppState {
            expected_auth: format!("Basic {}", STANDARD.encode(credentials)),
            options: options.clone(),
            inner: Arc::clone(&inner),
        };

        let app = Router::new()
            .route("/", get(|| async { "DHIS2" }))
            .route("/api/organisationUnits", post(create_org_unit))
            .route(
                "/api/users/{user_id}/organisationUnits/{org_unit_id}",
                post(add_org_unit_to_user),
            )
            .route("/api/filledOrganisationUnitLevels", post(create_levels))
            .route("/api/metadata", post(import_metadata))
            .with_state(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake DHIS2 listener");
        let addr = listener.local_addr().expect("Fake DHIS2 has no local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake DHIS2 server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            options,
            state: inner,
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API settings matching the fake's credentials
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            username: self.options.username.clone(),
            password: self.options.password.clone(),
            timeout_ms: 5_000,
            ..ApiConfig::default()
        }
    }

    pub fn org_unit(&self, uid: &str) -> Option<Value> {
        self.state.lock().unwrap().org_units.get(uid).cloned()
    }

    pub fn org_unit_count(&self) -> usize {
        self.state.lock().unwrap().org_units.len()
    }

    pub fn user_org_units(&self, user_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .user_org_units
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn levels(&self) -> Vec<Value> {
        self.state.lock().unwrap().levels.clone()
    }

    pub fn import_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().import_queries.clone()
    }

    /// Endpoints hit so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl Drop for FakeDhis2 {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn web_message(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn conflict(message: &str) -> Response {
    web_message(
        StatusCode::CONFLICT,
        json!({
            "httpStatus": "Conflict",
            "httpStatusCode": 409,
            "status": "ERROR",
            "message": message
        }),
    )
}

/// Auth and content-type checks shared by every API route
fn reject(state: &AppState, headers: &HeaderMap, call: &str) -> Option<Response> {
    state.inner.lock().unwrap().calls.push(call.to_string());

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if auth != Some(state.expected_auth.as_str()) {
        return Some(web_message(
            StatusCode::UNAUTHORIZED,
            json!({"httpStatus": "Unauthorized", "httpStatusCode": 401, "status": "ERROR"}),
        ));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        return Some(StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response());
    }

    None
}

async fn create_org_unit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(rejection) = reject(&state, &headers, "organisationUnits") {
        return rejection;
    }

    let Ok(unit) = serde_json::from_str::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let complete = ["name", "shortName"]
        .iter()
        .all(|key| unit.get(key).and_then(Value::as_str).is_some_and(|s| !s.is_empty()))
        && unit.get("openingDate").is_some_and(Value::is_i64);
    if !complete {
        return conflict("name, shortName and openingDate are required");
    }

    let uid = format!("Ou{}", &Uuid::new_v4().simple().to_string()[..9]);
    state.inner.lock().unwrap().org_units.insert(uid.clone(), unit);

    let mut response = json!({
        "responseType": "ObjectReport",
        "klass": "org.hisp.dhis.organisationunit.OrganisationUnit"
    });
    if !state.options.omit_uid {
        response["uid"] = json!(uid);
    }

    web_message(
        StatusCode::CREATED,
        json!({
            "httpStatus": "Created",
            "httpStatusCode": 201,
            "status": "OK",
            "response": response
        }),
    )
}

async fn add_org_unit_to_user(
    State(state): State<AppState>,
    Path((user_id, org_unit_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = reject(&state, &headers, "users/organisationUnits") {
        return rejection;
    }

    let mut inner = state.inner.lock().unwrap();
    if user_id != KNOWN_USER || !inner.org_units.contains_key(&org_unit_id) {
        return web_message(
            StatusCode::NOT_FOUND,
            json!({"httpStatus": "Not Found", "httpStatusCode": 404, "status": "ERROR"}),
        );
    }

    inner.user_org_units.entry(user_id).or_default().push(org_unit_id);
    StatusCode::NO_CONTENT.into_response()
}

async fn create_levels(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(rejection) = reject(&state, &headers, "filledOrganisationUnitLevels") {
        return rejection;
    }

    let levels = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("organisationUnitLevels").and_then(Value::as_array).cloned());
    let Some(levels) = levels.filter(|l| !l.is_empty()) else {
        return conflict("organisationUnitLevels must be a non-empty array");
    };

    state.inner.lock().unwrap().levels.extend(levels);
    web_message(
        StatusCode::CREATED,
        json!({"httpStatus": "Created", "httpStatusCode": 201, "status": "OK"}),
    )
}

async fn import_metadata(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(rejection) = reject(&state, &headers, "metadata") {
        return rejection;
    }

    let mut inner = state.inner.lock().unwrap();
    inner.import_queries.push(query);

    let Ok(Value::Object(metadata)) = serde_json::from_str::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let total: usize = metadata
        .values()
        .filter_map(Value::as_array)
        .map(Vec::len)
        .sum();

    let hierarchy_ready = inner
        .user_org_units
        .get(KNOWN_USER)
        .is_some_and(|units| !units.is_empty())
        && !inner.levels.is_empty();

    if !hierarchy_ready {
        return web_message(
            StatusCode::CONFLICT,
            json!({
                "httpStatus": "Conflict",
                "httpStatusCode": 409,
                "status": "ERROR",
                "response": {
                    "status": "ERROR",
                    "stats": {
                        "created": 0,
                        "updated": 0,
                        "deleted": 0,
                        "ignored": total,
                        "total": total
                    }
                }
            }),
        );
    }

    web_message(
        StatusCode::OK,
        json!({
            "status": "OK",
            "stats": {"created": total, "updated": 0, "deleted": 0, "ignored": 0, "total": total}
        }),
    )
}
