use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    issue_token, now, ok, Account, Alert, AlertShape, AuthUser, DeviceRecord, Envelope, Face,
    Failure, Location, LocationFix, MockState, Reply, StoredFace, User, VehicleStatus,
};

const RELATIONSHIPS: [&str; 5] = ["family", "friend", "employee", "neighbor", "other"];

// --- auth ---

#[derive(Deserialize)]
pub struct RegisterInput {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    email: String,
    password: String,
}

pub async fn register(State(state): State<MockState>, Json(input): Json<RegisterInput>) -> Reply<Value> {
    let email = input.email.trim().to_lowercase();
    if input.name.trim().is_empty() || !email.contains('@') || input.password.chars().count() < 6 {
        return Err(Failure::bad_request("Name, a valid email and a 6 character password are required"));
    }

    let mut backend = state.backend.write().await;
    if backend.accounts.contains_key(&email) {
        return Err(Failure::new(StatusCode::CONFLICT, "User already exists"));
    }
    let user = User {
        name: input.name.trim().to_string(),
        email: email.clone(),
        image_url: None,
    };
    backend.accounts.insert(
        email,
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    info!(email = %user.email, "registered");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success("User registered successfully", json!({ "user": user }))),
    ))
}

/// Wrong credentials are a business error: HTTP 200, `status: "error"`.
pub async fn login(State(state): State<MockState>, Json(input): Json<LoginInput>) -> Reply<Value> {
    let email = input.email.trim().to_lowercase();
    let mut backend = state.backend.write().await;

    let user = match backend.accounts.get(&email) {
        Some(account) if account.password == input.password => account.user.clone(),
        _ => return Err(Failure::new(StatusCode::OK, "Invalid credentials")),
    };
    let token = issue_token(&email);
    backend.sessions.insert(token.clone(), email);
    ok("Login successful", json!({ "access_token": token, "user": user }))
}

pub async fn me(State(state): State<MockState>, auth: AuthUser) -> Reply<Value> {
    let backend = state.backend.read().await;
    let account = backend
        .accounts
        .get(&auth.email)
        .ok_or_else(|| Failure::not_found("User not found"))?;
    ok("", json!({ "user": account.user }))
}

// --- faces ---

#[derive(Deserialize)]
pub struct RegisterFaceInput {
    name: String,
    relationship: String,
    image: String,
}

#[derive(Deserialize)]
pub struct VerifyFaceInput {
    image: String,
}

#[derive(Deserialize)]
pub struct AuthorizationInput {
    is_authorized: bool,
}

fn require_image(image: &str) -> Result<(), Failure> {
    if image.starts_with("data:image/") && image.contains(";base64,") {
        Ok(())
    } else {
        Err(Failure::bad_request("Image must be a base64 data URI"))
    }
}

pub async fn register_face(
    State(state): State<MockState>,
    auth: AuthUser,
    Json(input): Json<RegisterFaceInput>,
) -> Reply<Value> {
    if input.name.trim().is_empty() {
        return Err(Failure::bad_request("Name is required"));
    }
    if !RELATIONSHIPS.contains(&input.relationship.as_str()) {
        return Err(Failure::bad_request("Unknown relationship"));
    }
    require_image(&input.image)?;

    let face = Face {
        id: Uuid::new_v4().to_string(),
        name: input.name.trim().to_string(),
        relationship: input.relationship,
        is_authorized: true,
    };
    state.backend.write().await.faces.push(StoredFace {
        owner: auth.email,
        face: face.clone(),
        image: input.image,
    });
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success("Face registered successfully", json!({ "face": face }))),
    ))
}

/// A face matches when the exact same image was registered by the caller.
pub async fn verify_face(
    State(state): State<MockState>,
    auth: AuthUser,
    Json(input): Json<VerifyFaceInput>,
) -> Reply<Value> {
    require_image(&input.image)?;
    let backend = state.backend.read().await;
    let found = backend
        .faces
        .iter()
        .find(|f| f.owner == auth.email && f.image == input.image);

    match found {
        Some(stored) => ok("Face recognized", json!({ "match": true, "face": stored.face })),
        None => ok("No matching face", json!({ "match": false })),
    }
}

pub async fn list_faces(State(state): State<MockState>, auth: AuthUser) -> Reply<Value> {
    let backend = state.backend.read().await;
    let faces: Vec<&Face> = backend
        .faces
        .iter()
        .filter(|f| f.owner == auth.email)
        .map(|f| &f.face)
        .collect();
    ok("", json!({ "faces": faces }))
}

pub async fn update_authorization(
    State(state): State<MockState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<AuthorizationInput>,
) -> Reply<Value> {
    let mut backend = state.backend.write().await;
    let stored = backend
        .faces
        .iter_mut()
        .find(|f| f.owner == auth.email && f.face.id == id)
        .ok_or_else(|| Failure::not_found("Face not found"))?;
    stored.face.is_authorized = input.is_authorized;
    ok("Authorization updated", json!({ "face": stored.face }))
}

// --- alerts ---

#[derive(Deserialize)]
pub struct PushAlertInput {
    title: String,
    body: String,
    token: String,
    #[serde(rename = "type")]
    kind: String,
    timestamp: Value,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    face_details: Option<Value>,
}

pub async fn push_alert(
    State(state): State<MockState>,
    auth: AuthUser,
    Json(input): Json<PushAlertInput>,
) -> Reply<Value> {
    if input.token.trim().is_empty() {
        return Err(Failure::bad_request("Push token is required"));
    }
    let alert = Alert {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        body: input.body,
        kind: input.kind,
        timestamp: input.timestamp,
        location: input.location,
        face_details: input.face_details,
        status: "sent".to_string(),
        user_id: auth.email,
    };
    state.backend.write().await.alerts.push(alert.clone());
    ok("Alert sent", json!({ "alert_id": alert.id, "alert": alert }))
}

pub async fn alert_history(State(state): State<MockState>, auth: AuthUser) -> Reply<Value> {
    let backend = state.backend.read().await;
    let mine = backend.alerts.iter().filter(|a| a.user_id == auth.email);

    let alerts = match state.alert_shape() {
        AlertShape::List => json!(mine.collect::<Vec<_>>()),
        AlertShape::Keyed => json!(mine.map(|a| (a.id.clone(), a)).collect::<BTreeMap<_, _>>()),
    };
    ok("", json!({ "alerts": alerts }))
}

// --- vehicle ---

#[derive(Deserialize)]
pub struct VehicleStatusInput {
    locked: bool,
    alarm_active: bool,
    location: Location,
    battery_level: f64,
    temperature: f64,
}

#[derive(Deserialize)]
pub struct LocationInput {
    location: Location,
}

pub async fn vehicle_status(State(state): State<MockState>, auth: AuthUser) -> Reply<Value> {
    let mut backend = state.backend.write().await;
    let status = backend.vehicles.entry(auth.email).or_default().clone();
    ok("", json!({ "status": status }))
}

/// Whole-object replacement; `last_updated` is always set here.
pub async fn update_vehicle_status(
    State(state): State<MockState>,
    auth: AuthUser,
    Json(input): Json<VehicleStatusInput>,
) -> Reply<Value> {
    let status = VehicleStatus {
        locked: input.locked,
        alarm_active: input.alarm_active,
        location: input.location,
        battery_level: input.battery_level,
        temperature: input.temperature,
        last_updated: now(),
    };
    state
        .backend
        .write()
        .await
        .vehicles
        .insert(auth.email, status.clone());
    ok("Vehicle status updated", json!({ "status": status }))
}

pub async fn current_location(State(state): State<MockState>, auth: AuthUser) -> Reply<Value> {
    let mut backend = state.backend.write().await;
    let latest = backend
        .fixes
        .get(&auth.email)
        .and_then(|fixes| fixes.last())
        .cloned();
    let fix = match latest {
        Some(fix) => fix,
        None => {
            let status = backend.vehicles.entry(auth.email).or_default();
            LocationFix {
                id: Uuid::new_v4().to_string(),
                location: status.location,
                timestamp: status.last_updated.clone(),
            }
        }
    };
    ok("", json!({ "location": fix }))
}

pub async fn update_location(
    State(state): State<MockState>,
    auth: AuthUser,
    Json(input): Json<LocationInput>,
) -> Reply<Value> {
    let fix = LocationFix {
        id: Uuid::new_v4().to_string(),
        location: input.location,
        timestamp: now(),
    };
    let mut backend = state.backend.write().await;
    backend
        .fixes
        .entry(auth.email.clone())
        .or_default()
        .push(fix.clone());
    let status = backend.vehicles.entry(auth.email).or_default();
    status.location = input.location;
    status.last_updated = fix.timestamp.clone();
    ok("Location updated", json!({ "location": fix }))
}

/// Served as a map keyed by fix id, the way the realtime store keeps it.
pub async fn location_history(State(state): State<MockState>, auth: AuthUser) -> Reply<Value> {
    let backend = state.backend.read().await;
    let history: BTreeMap<&str, &LocationFix> = backend
        .fixes
        .get(&auth.email)
        .into_iter()
        .flatten()
        .map(|fix| (fix.id.as_str(), fix))
        .collect();
    ok("", json!({ "history": history }))
}

// --- devices ---

#[derive(Deserialize)]
pub struct RegisterDeviceInput {
    user_id: String,
    fcm_token: String,
    #[serde(default)]
    device_info: Option<Value>,
    #[serde(default = "unknown_permission")]
    permission_status: String,
}

#[derive(Deserialize)]
pub struct UpdatePermissionInput {
    user_id: String,
    fcm_token: String,
    permission_status: String,
}

#[derive(Deserialize)]
pub struct DeleteDeviceInput {
    user_id: String,
    fcm_token: String,
}

#[derive(Deserialize)]
pub struct DeviceQuery {
    user_id: Option<String>,
}

fn unknown_permission() -> String {
    "unknown".to_string()
}

fn device_gate(state: &MockState) -> Result<(), Failure> {
    if state.take_device_failure() {
        warn!("injected device failure");
        return Err(Failure::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
        ));
    }
    Ok(())
}

fn require_ids(user_id: &str, fcm_token: &str) -> Result<(), Failure> {
    if user_id.trim().is_empty() || fcm_token.trim().is_empty() {
        return Err(Failure::bad_request("user_id and fcm_token are required"));
    }
    Ok(())
}

/// Upsert keyed by `(user_id, fcm_token)`.
pub async fn register_device(
    State(state): State<MockState>,
    _auth: AuthUser,
    Json(input): Json<RegisterDeviceInput>,
) -> Reply<Value> {
    device_gate(&state)?;
    require_ids(&input.user_id, &input.fcm_token)?;

    let record = DeviceRecord {
        user_id: input.user_id,
        fcm_token: input.fcm_token,
        device_info: input.device_info,
        permission_status: input.permission_status,
    };
    let mut backend = state.backend.write().await;
    backend
        .devices
        .retain(|d| !(d.user_id == record.user_id && d.fcm_token == record.fcm_token));
    backend.devices.push(record.clone());
    ok("Device registered", json!({ "device": record }))
}

pub async fn update_permission(
    State(state): State<MockState>,
    _auth: AuthUser,
    Json(input): Json<UpdatePermissionInput>,
) -> Reply<Value> {
    device_gate(&state)?;
    require_ids(&input.user_id, &input.fcm_token)?;

    let mut backend = state.backend.write().await;
    let device = backend
        .devices
        .iter_mut()
        .find(|d| d.user_id == input.user_id && d.fcm_token == input.fcm_token)
        .ok_or_else(|| Failure::not_found("Device not found"))?;
    device.permission_status = input.permission_status;
    ok("Permission updated", json!({ "device": device }))
}

pub async fn delete_device(
    State(state): State<MockState>,
    _auth: AuthUser,
    Json(input): Json<DeleteDeviceInput>,
) -> Reply<Value> {
    device_gate(&state)?;
    require_ids(&input.user_id, &input.fcm_token)?;

    let mut backend = state.backend.write().await;
    let before = backend.devices.len();
    backend
        .devices
        .retain(|d| !(d.user_id == input.user_id && d.fcm_token == input.fcm_token));
    if backend.devices.len() == before {
        return Err(Failure::not_found("Device not found"));
    }
    ok("Device removed", json!({}))
}

pub async fn list_devices(
    State(state): State<MockState>,
    _auth: AuthUser,
    Query(query): Query<DeviceQuery>,
) -> Reply<Value> {
    device_gate(&state)?;
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| Failure::bad_request("user_id is required"))?;

    let backend = state.backend.read().await;
    let devices: Vec<&DeviceRecord> = backend.devices.iter().filter(|d| d.user_id == user_id).collect();
    ok("", json!({ "devices": devices }))
}
