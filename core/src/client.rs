//! Stateless HTTP request builder and envelope parser for the homeguard API.
//!
//! # Design
//! `HomeguardClient` holds only a base URL and default headers and carries
//! no mutable state between calls. Each endpoint has a `build_*` method that
//! produces an `HttpRequest`; `parse` turns any `HttpResponse` into an
//! `ApiResponse<T>`. The caller executes the HTTP round-trip in between,
//! which keeps this layer deterministic and lets a mobile host drive it
//! through the FFI crate. `ApiClient` adds the token, the interceptors and
//! the I/O on top.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::ClientConfig;
use crate::envelope::{server_message, ApiResponse};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    LoginRequest, PushAlertRequest, RegisterDeviceRequest, RegisterFaceRequest, RegisterRequest,
    UnregisterDeviceRequest, UpdateAuthorizationRequest, UpdateLocationRequest,
    UpdatePermissionRequest, UpdateVehicleStatusRequest, VerifyFaceRequest,
};

pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_ME: &str = "/auth/me";
pub const FACES_REGISTER: &str = "/faces/register";
pub const FACES_VERIFY: &str = "/faces/verify";
pub const FACES_LIST: &str = "/faces/list";
pub const ALERTS_PUSH: &str = "/alerts/push";
pub const ALERTS_HISTORY: &str = "/alerts/history";
pub const VEHICLE_STATUS: &str = "/vehicle/status";
pub const VEHICLE_LOCATION: &str = "/vehicle/location";
pub const VEHICLE_LOCATION_HISTORY: &str = "/vehicle/location/history";
pub const DEVICE_REGISTER: &str = "/api/user-device/register";
pub const DEVICE_UPDATE_PERMISSION: &str = "/api/user-device/update-permission";
pub const DEVICE_DELETE: &str = "/api/user-device/delete";
pub const DEVICE_LIST: &str = "/api/user-device/list";

#[derive(Debug, Clone)]
pub struct HomeguardClient {
    base_url: String,
    default_headers: Vec<(String, String)>,
}

impl HomeguardClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: Vec::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            default_headers: config.default_headers.clone(),
            ..Self::new(&config.base_url)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request without a body. `path` is relative to the base URL.
    pub fn build_empty(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: self.url(path),
            headers: self.default_headers.clone(),
            body: None,
        }
    }

    /// Build a request carrying `body` as JSON.
    pub fn build_json<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.build_empty(method, path);
        req.set_header("content-type", "application/json".to_string());
        req.body = Some(body);
        Ok(req)
    }

    /// Attach `Authorization: Bearer <token>`.
    pub fn authorize(&self, request: &mut HttpRequest, token: &str) {
        request.set_header("authorization", format!("Bearer {token}"));
    }

    // --- auth ---

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, AUTH_REGISTER, input)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, AUTH_LOGIN, input)
    }

    pub fn build_current_user(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, AUTH_ME)
    }

    // --- faces ---

    pub fn build_register_face(&self, input: &RegisterFaceRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, FACES_REGISTER, input)
    }

    pub fn build_verify_face(&self, input: &VerifyFaceRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, FACES_VERIFY, input)
    }

    pub fn build_list_faces(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, FACES_LIST)
    }

    pub fn build_update_authorization(
        &self,
        face_id: &str,
        input: &UpdateAuthorizationRequest,
    ) -> Result<HttpRequest, ApiError> {
        let path = authorization_path(face_id)?;
        self.build_json(HttpMethod::Put, &path, input)
    }

    // --- alerts ---

    pub fn build_push_alert(&self, input: &PushAlertRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, ALERTS_PUSH, input)
    }

    pub fn build_alert_history(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, ALERTS_HISTORY)
    }

    // --- vehicle & location ---

    pub fn build_vehicle_status(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, VEHICLE_STATUS)
    }

    pub fn build_update_vehicle_status(
        &self,
        input: &UpdateVehicleStatusRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, VEHICLE_STATUS, input)
    }

    pub fn build_location(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, VEHICLE_LOCATION)
    }

    pub fn build_location_history(&self) -> HttpRequest {
        self.build_empty(HttpMethod::Get, VEHICLE_LOCATION_HISTORY)
    }

    pub fn build_update_location(&self, input: &UpdateLocationRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, VEHICLE_LOCATION, input)
    }

    // --- devices ---

    pub fn build_register_device(&self, input: &RegisterDeviceRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, DEVICE_REGISTER, input)
    }

    pub fn build_update_permission(
        &self,
        input: &UpdatePermissionRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, DEVICE_UPDATE_PERMISSION, input)
    }

    pub fn build_unregister_device(
        &self,
        input: &UnregisterDeviceRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, DEVICE_DELETE, input)
    }

    pub fn build_list_devices(&self, user_id: &str) -> Result<HttpRequest, ApiError> {
        let path = device_list_path(user_id)?;
        Ok(self.build_empty(HttpMethod::Get, &path))
    }

    // --- parsing ---

    /// Turn a response into an envelope.
    ///
    /// 401 becomes `Unauthorized`; any other non-2xx becomes `Http` with the
    /// server's `message` when it sent one. A 2xx body that is not a valid
    /// envelope is a `Deserialization` error.
    pub fn parse<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<ApiResponse<T>, ApiError> {
        check_status(response)?;
        ApiResponse::from_json(&response.body)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 401 {
        return Err(ApiError::Unauthorized);
    }
    let message = server_message(&response.body)
        .unwrap_or_else(|| format!("Request failed with status code {}", response.status));
    Err(ApiError::Http {
        status: response.status,
        message,
        data: serde_json::from_str(&response.body).ok(),
    })
}

// Paths with caller-supplied parts go through `Url` for escaping; only the
// path-and-query part is kept.
fn relative(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_string(),
    }
}

fn scratch_url(path: &str) -> Result<Url, ApiError> {
    Url::parse("http://homeguard.invalid/")
        .and_then(|base| base.join(path.trim_start_matches('/')))
        .map_err(|e| ApiError::Serialization(e.to_string()))
}

fn authorization_path(face_id: &str) -> Result<String, ApiError> {
    if face_id.trim().is_empty() {
        return Err(ApiError::validation("face_id", "is required"));
    }
    let mut url = scratch_url("")?;
    url.path_segments_mut()
        .map_err(|_| ApiError::validation("face_id", "cannot be encoded"))?
        .extend(["faces", face_id, "authorization"]);
    Ok(relative(&url))
}

fn device_list_path(user_id: &str) -> Result<String, ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::validation("user_id", "is required"));
    }
    let mut url = scratch_url(DEVICE_LIST)?;
    url.query_pairs_mut().append_pair("user_id", user_id);
    Ok(relative(&url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Relationship, User};

    fn client() -> HomeguardClient {
        HomeguardClient::new("http://localhost:3000")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_login_produces_json_post() {
        let input = LoginRequest {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
        };
        let req = client().build_login(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/auth/login");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["password"], "secret1");
    }

    #[test]
    fn get_requests_have_no_body() {
        for req in [
            client().build_current_user(),
            client().build_list_faces(),
            client().build_alert_history(),
            client().build_vehicle_status(),
            client().build_location(),
            client().build_location_history(),
        ] {
            assert_eq!(req.method, HttpMethod::Get);
            assert!(req.body.is_none(), "{}", req.url);
            assert!(req.header("content-type").is_none());
        }
    }

    #[test]
    fn config_default_headers_are_applied() {
        let c = HomeguardClient::from_config(&ClientConfig::new("http://api.test/"));
        let req = c.build_list_faces();
        assert_eq!(req.url, "http://api.test/faces/list");
        assert_eq!(req.header("accept"), Some("application/json"));
    }

    #[test]
    fn authorize_sets_bearer_header_once() {
        let c = client();
        let mut req = c.build_vehicle_status();
        c.authorize(&mut req, "old");
        c.authorize(&mut req, "tok123");
        assert_eq!(req.header("authorization"), Some("Bearer tok123"));
        assert_eq!(req.headers.iter().filter(|(k, _)| k == "authorization").count(), 1);
    }

    #[test]
    fn update_authorization_escapes_face_id() {
        let input = UpdateAuthorizationRequest { is_authorized: true };
        let req = client().build_update_authorization("face 1/2", &input).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/faces/face%201%2F2/authorization");
        assert!(client().build_update_authorization(" ", &input).is_err());
    }

    #[test]
    fn list_devices_encodes_user_id_query() {
        let req = client().build_list_devices("a+b@c.com").unwrap();
        assert_eq!(req.url, "http://localhost:3000/api/user-device/list?user_id=a%2Bb%40c.com");
    }

    #[test]
    fn register_face_serializes_relationship_lowercase() {
        let input = RegisterFaceRequest {
            name: "Sam".to_string(),
            relationship: Relationship::Neighbor,
            image: "data:image/jpeg;base64,AAAA".to_string(),
        };
        let req = client().build_register_face(&input).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["relationship"], "neighbor");
    }

    #[test]
    fn parse_success_envelope() {
        let resp = response(200, r#"{"status":"success","message":"","data":{"user":{"name":"A","email":"a@b.com"}}}"#);
        let parsed: ApiResponse<crate::types::CurrentUserData> = client().parse(&resp).unwrap();
        assert_eq!(
            parsed.into_data().unwrap().user,
            User { name: "A".to_string(), email: "a@b.com".to_string(), image_url: None }
        );
    }

    #[test]
    fn parse_business_error_is_a_value() {
        let resp = response(200, r#"{"status":"error","message":"Invalid email or password","data":{}}"#);
        let parsed: ApiResponse<crate::types::LoginData> = client().parse(&resp).unwrap();
        assert!(!parsed.is_success());
        assert_eq!(parsed.message(), "Invalid email or password");
    }

    #[test]
    fn parse_401_is_unauthorized() {
        let resp = response(401, r#"{"status":"error","message":"Token expired","data":{}}"#);
        let err = client().parse::<serde_json::Value>(&resp).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn parse_non_2xx_prefers_server_message() {
        let resp = response(409, r#"{"status":"error","message":"Email already registered","data":{}}"#);
        let err = client().parse::<serde_json::Value>(&resp).unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.message(), "Email already registered");
        assert!(err.data().is_some());
    }

    #[test]
    fn parse_non_2xx_without_json_falls_back_to_status_text() {
        let resp = response(502, "<html>bad gateway</html>");
        let err = client().parse::<serde_json::Value>(&resp).unwrap_err();
        assert_eq!(err.message(), "Request failed with status code 502");
        assert!(err.data().is_none());
    }

    #[test]
    fn parse_malformed_success_body() {
        let err = client().parse::<serde_json::Value>(&response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = HomeguardClient::new("http://localhost:3000/");
        assert_eq!(client.build_list_faces().url, "http://localhost:3000/faces/list");
    }
}
