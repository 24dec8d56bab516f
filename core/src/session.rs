//! Client-held authentication state and its persistence lifecycle.
//!
//! # Design
//! `Session` stores only the user and the token; `is_authenticated` is derived
//! from them, so "authenticated iff user and token are both present" cannot be
//! violated. `SessionStore` is a cheap-to-clone handle shared by the API client
//! and the services. Every mutation writes a snapshot to `SESSION_KEY`, and
//! `rehydrate` reads it back at process start.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::storage::{Storage, SESSION_KEY};
use crate::types::User;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    access_token: Option<String>,
}

impl Session {
    /// A signed-in session. A blank token is no token at all, matching how
    /// the request interceptor treats it, so the result is signed out.
    pub fn authenticated(user: User, access_token: String) -> Self {
        if access_token.trim().is_empty() {
            return Self::default();
        }
        Self {
            user: Some(user),
            access_token: Some(access_token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

/// Persisted shape of a session.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    is_authenticated: bool,
    user: Option<User>,
    access_token: Option<String>,
}

impl From<&Session> for Snapshot {
    fn from(session: &Session) -> Self {
        Self {
            is_authenticated: session.is_authenticated(),
            user: session.user.clone(),
            access_token: session.access_token.clone(),
        }
    }
}

impl From<Snapshot> for Session {
    fn from(snapshot: Snapshot) -> Self {
        // A half-populated snapshot is treated as signed out.
        match (snapshot.user, snapshot.access_token) {
            (Some(user), Some(token)) if snapshot.is_authenticated => {
                Session::authenticated(user, token)
            }
            _ => Session::default(),
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<Session>>,
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// A signed-out store. Call `rehydrate` to load a persisted session.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(Session::default())),
            storage,
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    /// Record a successful sign-in and persist it.
    pub fn set_auth_data(&self, user: User, access_token: String) -> Result<(), ApiError> {
        if access_token.trim().is_empty() {
            return Err(ApiError::validation("access_token", "Access token is required"));
        }
        let mut state = self.state.write();
        *state = Session::authenticated(user, access_token);
        info!(email = %state.user.as_ref().map(|u| u.email.as_str()).unwrap_or_default(), "session established");
        self.persist(&state)
    }

    /// Reset to the signed-out state and drop the persisted snapshot. The
    /// in-memory state is cleared even if the storage write fails.
    pub fn clear_auth_data(&self) -> Result<(), ApiError> {
        let mut state = self.state.write();
        *state = Session::default();
        info!("session cleared");
        self.storage.remove(SESSION_KEY)
    }

    /// Load the persisted snapshot, replacing the in-memory state. A corrupt
    /// snapshot is discarded and leaves the store signed out.
    pub fn rehydrate(&self) -> Result<Session, ApiError> {
        let restored = match self.storage.get(SESSION_KEY)? {
            None => Session::default(),
            Some(raw) => match serde_json::from_str::<Snapshot>(&raw) {
                Ok(snapshot) => Session::from(snapshot),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable session snapshot");
                    self.storage.remove(SESSION_KEY)?;
                    Session::default()
                }
            },
        };
        *self.state.write() = restored.clone();
        Ok(restored)
    }

    fn persist(&self, session: &Session) -> Result<(), ApiError> {
        let json = serde_json::to_string(&Snapshot::from(session))
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.storage.set(SESSION_KEY, &json)
    }
}

/// The `sub` claim of a JWT, read without verifying the signature. Used to
/// learn which identity realtime alerts should be matched against.
pub fn token_subject(token: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Claims {
        sub: Option<String>,
        email: Option<String>,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.sub.or(claims.email)
}
