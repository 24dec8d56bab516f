//! The executing HTTP wrapper: token attachment, transport, response
//! interception and envelope parsing in one place.
//!
//! # Design
//! Every call goes through `ApiClient::send`:
//!
//! 1. the request interceptor reads the token from storage and, when present,
//!    attaches it as a bearer header before anything is sent;
//! 2. the transport performs the round-trip;
//! 3. the response interceptor handles 401 by wiping the token, clearing the
//!    session store and sending the host to sign-in, all under one lock, then
//!    fails with `Unauthorized` without alerting. Any other failure raises a
//!    single user-visible alert and is returned as a normalized `ApiError`.
//!
//! There is no retry here; `RetryPolicy` wraps calls one level up where
//! repeating them is safe.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::client::HomeguardClient;
use crate::config::ClientConfig;
use crate::context::AppContext;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::host::Route;
use crate::http::{HttpMethod, HttpRequest, Transport};
use crate::session::SessionStore;
use crate::storage::{Storage, ACCESS_TOKEN_KEY};

const ALERT_TITLE: &str = "Error";

#[derive(Clone)]
pub struct ApiClient {
    endpoints: HomeguardClient,
    transport: Arc<dyn Transport>,
    context: AppContext,
    reset_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>, context: AppContext) -> Self {
        Self {
            endpoints: HomeguardClient::from_config(config),
            transport,
            context,
            reset_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Client over a blocking `ureq` transport using the configured timeout.
    #[cfg(feature = "ureq")]
    pub fn with_ureq(config: &ClientConfig, context: AppContext) -> Self {
        let transport = Arc::new(crate::http::UreqTransport::from_config(config));
        Self::new(config, transport, context)
    }

    pub fn endpoints(&self) -> &HomeguardClient {
        &self.endpoints
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn session(&self) -> &SessionStore {
        &self.context.session
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.context.storage
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send(self.endpoints.build_empty(HttpMethod::Get, path))
    }

    pub fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(self.endpoints.build_json(HttpMethod::Post, path, body)?)
    }

    pub fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(self.endpoints.build_json(HttpMethod::Put, path, body)?)
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send(self.endpoints.build_empty(HttpMethod::Delete, path))
    }

    /// Run a prepared request through both interceptors.
    pub fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<ApiResponse<T>, ApiError> {
        self.execute(request, true)
    }

    /// Like `send`, but failures other than 401 are not shown to the user.
    /// Retrying callers use this and alert once when they give up.
    pub fn send_quietly<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.execute(request, false)
    }

    /// Show `err` to the user the way the response interceptor would.
    pub fn alert(&self, err: &ApiError) {
        if !matches!(err, ApiError::Unauthorized) {
            self.context.notifier.alert(ALERT_TITLE, &err.message());
        }
    }

    fn execute<T: DeserializeOwned>(
        &self,
        mut request: HttpRequest,
        alert: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.attach_token(&mut request)?;
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let outcome = self
            .transport
            .execute(&request)
            .and_then(|response| self.endpoints.parse(&response));

        match outcome {
            Ok(envelope) => Ok(envelope),
            Err(ApiError::Unauthorized) => {
                self.reset_session();
                Err(ApiError::Unauthorized)
            }
            Err(err) => {
                debug!(error = %err, url = %request.url, "request failed");
                if alert {
                    self.alert(&err);
                }
                Err(err)
            }
        }
    }

    fn attach_token(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        if let Some(token) = self.context.storage.get(ACCESS_TOKEN_KEY)? {
            if !token.is_empty() {
                self.endpoints.authorize(request, &token);
            }
        }
        Ok(())
    }

    /// Wipe the persisted token and the session, then route to sign-in.
    /// Concurrent 401s run this one at a time.
    fn reset_session(&self) {
        let _guard = self.reset_lock.lock();
        warn!("backend answered 401, signing out");

        if let Err(e) = self.context.storage.remove(ACCESS_TOKEN_KEY) {
            error!(error = %e, "failed to remove access token");
        }
        if let Err(e) = self.context.session.clear_auth_data() {
            error!(error = %e, "failed to clear persisted session");
        }
        self.context.navigator.replace(Route::SignIn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{Harness, ScriptedTransport};
    use crate::types::{User, VehicleStatusData};

    const STATUS_OK: &str = r#"{"status":"success","message":"","data":{"status":{
        "locked":true,"alarm_active":false,"location":{"latitude":1.0,"longitude":2.0},
        "battery_level":90,"temperature":20.5,"last_updated":"2024-05-01T10:00:00Z"}}}"#;

    #[test]
    fn attaches_bearer_token_when_stored() {
        let h = Harness::new(vec![ScriptedTransport::ok(STATUS_OK)]);
        h.storage.set(ACCESS_TOKEN_KEY, "tok123").unwrap();

        let resp: ApiResponse<VehicleStatusData> = h.api.get("/vehicle/status").unwrap();
        assert!(resp.data().unwrap().status.locked);

        let sent = h.transport.requests();
        assert_eq!(sent[0].header("authorization"), Some("Bearer tok123"));
    }

    #[test]
    fn omits_authorization_without_token() {
        let h = Harness::new(vec![ScriptedTransport::ok(STATUS_OK)]);
        let _: ApiResponse<VehicleStatusData> = h.api.get("/vehicle/status").unwrap();
        assert!(h.transport.requests()[0].header("authorization").is_none());
    }

    #[test]
    fn token_is_read_fresh_for_every_request() {
        let h = Harness::new(vec![ScriptedTransport::ok(STATUS_OK), ScriptedTransport::ok(STATUS_OK)]);
        h.storage.set(ACCESS_TOKEN_KEY, "first").unwrap();
        let _: ApiResponse<VehicleStatusData> = h.api.get("/vehicle/status").unwrap();
        h.storage.set(ACCESS_TOKEN_KEY, "second").unwrap();
        let _: ApiResponse<VehicleStatusData> = h.api.get("/vehicle/status").unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent[0].header("authorization"), Some("Bearer first"));
        assert_eq!(sent[1].header("authorization"), Some("Bearer second"));
    }

    #[test]
    fn unauthorized_wipes_session_and_redirects_without_alert() {
        let h = Harness::new(vec![ScriptedTransport::status(
            401,
            r#"{"status":"error","message":"Token expired","data":{}}"#,
        )]);
        h.storage.set(ACCESS_TOKEN_KEY, "stale").unwrap();
        h.api
            .session()
            .set_auth_data(
                User { name: "A".into(), email: "a@b.com".into(), image_url: None },
                "stale".into(),
            )
            .unwrap();

        let err = h.api.get::<VehicleStatusData>("/vehicle/status").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(h.storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(!h.api.session().is_authenticated());
        assert_eq!(h.navigator.routes(), vec![Route::SignIn]);
        assert!(h.notifier.messages().is_empty());
    }

    #[test]
    fn server_error_alerts_once_with_server_message() {
        let h = Harness::new(vec![ScriptedTransport::status(
            500,
            r#"{"status":"error","message":"Vehicle offline","data":{"code":7}}"#,
        )]);
        let err = h.api.get::<VehicleStatusData>("/vehicle/status").unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), "Vehicle offline");
        assert_eq!(err.data().unwrap()["data"]["code"], 7);
        assert_eq!(h.notifier.messages(), vec!["Vehicle offline".to_string()]);
        assert!(h.navigator.routes().is_empty());
    }

    #[test]
    fn transport_failure_alerts_with_transport_text() {
        let h = Harness::new(vec![ScriptedTransport::fail("connection refused")]);
        let err = h.api.get::<VehicleStatusData>("/vehicle/status").unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(h.notifier.messages(), vec!["connection refused".to_string()]);
    }

    #[test]
    fn send_quietly_skips_the_alert_but_still_resets_on_401() {
        let h = Harness::new(vec![
            ScriptedTransport::status(503, r#"{"status":"error","message":"busy","data":{}}"#),
            ScriptedTransport::status(401, ""),
        ]);
        let req = h.api.endpoints().build_list_faces();
        assert!(h.api.send_quietly::<serde_json::Value>(req.clone()).is_err());
        assert!(h.notifier.messages().is_empty());

        let err = h.api.send_quietly::<serde_json::Value>(req).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(h.navigator.routes(), vec![Route::SignIn]);
    }

    #[test]
    fn business_error_is_returned_without_alert() {
        let h = Harness::new(vec![ScriptedTransport::ok(
            r#"{"status":"error","message":"Vehicle not paired","data":null}"#,
        )]);
        let resp = h.api.get::<VehicleStatusData>("/vehicle/status").unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.message(), "Vehicle not paired");
        assert!(h.notifier.messages().is_empty());
    }

    #[test]
    fn storage_read_failure_stops_before_sending() {
        let h = Harness::with_storage(Arc::new(crate::testing::BrokenStorage), vec![]);
        let err = h.api.get::<VehicleStatusData>("/vehicle/status").unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
        assert!(h.transport.requests().is_empty());
    }

    #[test]
    fn verbs_map_to_methods() {
        let ok = r#"{"status":"success","message":"","data":null}"#;
        let h = Harness::new(vec![
            ScriptedTransport::ok(ok),
            ScriptedTransport::ok(ok),
            ScriptedTransport::ok(ok),
            ScriptedTransport::ok(ok),
        ]);
        let body = serde_json::json!({"k": 1});
        let _: ApiResponse<()> = h.api.get("/a").unwrap();
        let _: ApiResponse<()> = h.api.post("/b", &body).unwrap();
        let _: ApiResponse<()> = h.api.put("/c", &body).unwrap();
        let _: ApiResponse<()> = h.api.delete("/d").unwrap();

        let methods: Vec<_> = h.transport.requests().iter().map(|r| r.method).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete]
        );
    }

    #[test]
    fn memory_storage_is_shared_with_session() {
        let storage = Arc::new(MemoryStorage::new());
        let h = Harness::with_storage(storage.clone(), vec![]);
        h.api
            .session()
            .set_auth_data(User { name: "A".into(), email: "a@b.com".into(), image_url: None }, "t".into())
            .unwrap();
        assert!(storage.get(crate::storage::SESSION_KEY).unwrap().is_some());
    }
}
