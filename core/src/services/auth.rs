use tracing::info;

use crate::api::ApiClient;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::host::Route;
use crate::session::Session;
use crate::storage::ACCESS_TOKEN_KEY;
use crate::types::{CurrentUserData, LoginData, LoginRequest, RegisterData, RegisterRequest};
use crate::validate;

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Create an account. Form rules are checked before anything is sent.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<ApiResponse<RegisterData>, ApiError> {
        validate::registration(name, email, password)?;
        let input = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.api.send(self.api.endpoints().build_register(&input)?)
    }

    /// Exchange credentials for a token. A success envelope has its token
    /// written to storage before this returns, so the next request carries it.
    pub fn login(&self, email: &str, password: &str) -> Result<ApiResponse<LoginData>, ApiError> {
        let input = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response: ApiResponse<LoginData> = self.api.send(self.api.endpoints().build_login(&input)?)?;

        if let ApiResponse::Success { data, .. } = &response {
            self.api.storage().set(ACCESS_TOKEN_KEY, &data.access_token)?;
            info!(email = %data.user.email, "logged in");
        }
        Ok(response)
    }

    pub fn get_current_user(&self) -> Result<ApiResponse<CurrentUserData>, ApiError> {
        self.api.send(self.api.endpoints().build_current_user())
    }

    /// Forget the persisted token. The session store and navigation are left
    /// to the caller; see `sign_out`.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.api.storage().remove(ACCESS_TOKEN_KEY)?;
        info!("logged out");
        Ok(())
    }

    /// The sign-in form: validate, log in, then publish the session and move
    /// to the home screen. An error envelope leaves the session untouched.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<ApiResponse<LoginData>, ApiError> {
        validate::login(email, password)?;
        let response = self.login(email, password)?;

        if let ApiResponse::Success { data, .. } = &response {
            self.api
                .session()
                .set_auth_data(data.user.clone(), data.access_token.clone())?;
            self.api.context().navigator.replace(Route::Home);
        }
        Ok(response)
    }

    pub fn sign_out(&self) -> Result<(), ApiError> {
        self.logout()?;
        self.api.session().clear_auth_data()?;
        self.api.context().navigator.replace(Route::SignIn);
        Ok(())
    }

    /// Load the persisted session. Call once at start-up, before any guarded
    /// screen checks `is_authenticated`.
    pub fn restore_session(&self) -> Result<Session, ApiError> {
        self.api.session().rehydrate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SESSION_KEY;
    use crate::testing::{Harness, ScriptedTransport};

    const LOGIN_OK: &str = r#"{"status":"success","message":"Login successful","data":{
        "access_token":"tok123","user":{"name":"A","email":"a@b.com"}}}"#;
    const LOGIN_BAD: &str = r#"{"status":"error","message":"Invalid credentials","data":{}}"#;
    const ME_OK: &str = r#"{"status":"success","message":"","data":{"user":{"name":"A","email":"a@b.com"}}}"#;

    fn service(h: &Harness) -> AuthService {
        AuthService::new(h.api.clone())
    }

    #[test]
    fn login_persists_token_before_next_request() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_OK), ScriptedTransport::ok(ME_OK)]);
        let auth = service(&h);

        let resp = auth.login("a@b.com", "secret").unwrap();
        assert_eq!(resp.data().unwrap().access_token, "tok123");
        assert_eq!(h.storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("tok123"));

        auth.get_current_user().unwrap();
        let sent = h.transport.requests();
        assert!(sent[0].header("authorization").is_none());
        assert_eq!(sent[1].header("authorization"), Some("Bearer tok123"));
    }

    #[test]
    fn failed_login_keeps_storage_empty() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_BAD)]);
        let resp = service(&h).login("a@b.com", "wrong").unwrap();

        assert!(!resp.is_success());
        assert_eq!(resp.message(), "Invalid credentials");
        assert!(h.storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn register_rejects_short_password_without_sending() {
        let h = Harness::new(vec![]);
        let err = service(&h).register("A", "a@b.com", "123").unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "password", .. }));
        assert!(h.transport.requests().is_empty());
    }

    #[test]
    fn register_sends_trimmed_fields() {
        let h = Harness::new(vec![ScriptedTransport::ok(ME_OK)]);
        let resp = service(&h).register(" A ", " a@b.com", "secret").unwrap();
        assert_eq!(resp.data().unwrap().user.email, "a@b.com");

        let body: serde_json::Value =
            serde_json::from_str(h.transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "A");
        assert_eq!(body["email"], "a@b.com");
    }

    #[test]
    fn logout_only_clears_token() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_OK)]);
        let auth = service(&h);
        auth.sign_in("a@b.com", "secret").unwrap();

        auth.logout().unwrap();
        assert!(h.storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(h.api.session().is_authenticated());
    }

    #[test]
    fn sign_in_publishes_session_and_navigates_home() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_OK)]);
        service(&h).sign_in("a@b.com", "secret").unwrap();

        let session = h.api.session().snapshot();
        assert!(session.is_authenticated());
        assert_eq!(session.access_token(), Some("tok123"));
        assert!(h.storage.get(SESSION_KEY).unwrap().is_some());
        assert_eq!(h.navigator.routes(), vec![Route::Home]);
    }

    #[test]
    fn sign_in_with_error_envelope_leaves_session_alone() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_BAD)]);
        let resp = service(&h).sign_in("a@b.com", "wrong").unwrap();

        assert!(!resp.is_success());
        assert!(!h.api.session().is_authenticated());
        assert!(h.navigator.routes().is_empty());
    }

    #[test]
    fn sign_out_clears_everything_and_returns_to_sign_in() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_OK)]);
        let auth = service(&h);
        auth.sign_in("a@b.com", "secret").unwrap();

        auth.sign_out().unwrap();
        assert!(!h.api.session().is_authenticated());
        assert!(h.storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert_eq!(h.navigator.routes(), vec![Route::Home, Route::SignIn]);
    }

    #[test]
    fn restore_session_reads_persisted_snapshot() {
        let h = Harness::new(vec![ScriptedTransport::ok(LOGIN_OK)]);
        service(&h).sign_in("a@b.com", "secret").unwrap();

        let fresh = Harness::with_storage(h.storage.clone(), vec![]);
        let restored = service(&fresh).restore_session().unwrap();
        assert!(restored.is_authenticated());
        assert_eq!(restored.user().unwrap().email, "a@b.com");
    }
}
