//! In-memory Homeguard backend.
//!
//! Every reply uses the `{status, message, data}` envelope. Protected routes
//! want a bearer token issued by `/auth/login` and answer 401 otherwise.
//! Two knobs exist for client tests: the alert history shape (keyed map or
//! list) and a count of injected 503s on the device routes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

mod routes;

// --- wire types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: String,
    pub name: String,
    pub relationship: String,
    pub is_authorized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_details: Option<Value>,
    pub status: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub locked: bool,
    pub alarm_active: bool,
    pub location: Location,
    pub battery_level: f64,
    pub temperature: f64,
    pub last_updated: String,
}

impl Default for VehicleStatus {
    fn default() -> Self {
        Self {
            locked: true,
            alarm_active: false,
            location: Location {
                latitude: 37.7749,
                longitude: -122.4194,
            },
            battery_level: 85.0,
            temperature: 22.5,
            last_updated: now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub id: String,
    pub location: Location,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub user_id: String,
    pub fcm_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<Value>,
    pub permission_status: String,
}

/// Shape of `data.alerts` in the history reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertShape {
    #[default]
    Keyed,
    List,
}

// --- state ---

struct Account {
    user: User,
    password: String,
}

struct StoredFace {
    owner: String,
    face: Face,
    image: String,
}

#[derive(Default)]
struct Backend {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, String>,
    faces: Vec<StoredFace>,
    alerts: Vec<Alert>,
    vehicles: HashMap<String, VehicleStatus>,
    fixes: HashMap<String, Vec<LocationFix>>,
    devices: Vec<DeviceRecord>,
}

#[derive(Default)]
struct Knobs {
    alerts_as_list: AtomicBool,
    device_failures: AtomicU32,
}

/// Shared server state. Cloning shares the same backend, so a test can keep
/// a handle while the router serves requests.
#[derive(Clone, Default)]
pub struct MockState {
    backend: Arc<RwLock<Backend>>,
    knobs: Arc<Knobs>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_alert_shape(&self, shape: AlertShape) {
        self.knobs
            .alerts_as_list
            .store(shape == AlertShape::List, Ordering::SeqCst);
    }

    pub fn alert_shape(&self) -> AlertShape {
        if self.knobs.alerts_as_list.load(Ordering::SeqCst) {
            AlertShape::List
        } else {
            AlertShape::Keyed
        }
    }

    /// The next `count` device-route calls answer 503.
    pub fn fail_next_device_calls(&self, count: u32) {
        self.knobs.device_failures.store(count, Ordering::SeqCst);
    }

    fn take_device_failure(&self) -> bool {
        self.knobs
            .device_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

// --- replies ---

/// An error envelope with its HTTP status.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = Envelope {
            status: "error".to_string(),
            message: self.message,
            data: json!({}),
        };
        (self.status, Json(body)).into_response()
    }
}

type Reply<T> = Result<(StatusCode, Json<Envelope<T>>), Failure>;

fn ok<T>(message: &str, data: T) -> Reply<T> {
    Ok((StatusCode::OK, Json(Envelope::success(message, data))))
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// JWT-shaped token whose payload carries the account e-mail as `sub`.
/// Unsigned; only the session table decides whether it is valid.
fn issue_token(email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = json!({ "sub": email, "jti": Uuid::new_v4(), "iat": Utc::now().timestamp() });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.mock")
}

// --- auth extractor ---

/// The account behind the request's bearer token.
pub struct AuthUser {
    pub email: String,
}

impl FromRequestParts<MockState> for AuthUser {
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &MockState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| Failure::unauthorized("Missing bearer token"))?;

        let backend = state.backend.read().await;
        backend
            .sessions
            .get(token)
            .map(|email| AuthUser { email: email.clone() })
            .ok_or_else(|| Failure::unauthorized("Invalid or expired token"))
    }
}

// --- router ---

pub fn app() -> Router {
    app_with_state(MockState::new())
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/auth/register", post(routes::register))
        .route("/auth/login", post(routes::login))
        .route("/auth/me", get(routes::me))
        .route("/faces/register", post(routes::register_face))
        .route("/faces/verify", post(routes::verify_face))
        .route("/faces/list", get(routes::list_faces))
        .route("/faces/{id}/authorization", put(routes::update_authorization))
        .route("/alerts/push", post(routes::push_alert))
        .route("/alerts/history", get(routes::alert_history))
        .route(
            "/vehicle/status",
            get(routes::vehicle_status).post(routes::update_vehicle_status),
        )
        .route(
            "/vehicle/location",
            get(routes::current_location).post(routes::update_location),
        )
        .route("/vehicle/location/history", get(routes::location_history))
        .route("/api/user-device/register", post(routes::register_device))
        .route("/api/user-device/update-permission", post(routes::update_permission))
        .route("/api/user-device/delete", post(routes::delete_device))
        .route("/api/user-device/list", get(routes::list_devices))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}
