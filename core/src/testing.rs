//! In-process doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::host::{Navigator, Notifier, Route};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::storage::{MemoryStorage, Storage};

pub type Scripted = Result<HttpResponse, ApiError>;

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(body: &str) -> Scripted {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Scripted {
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        })
    }

    pub fn fail(message: &str) -> Scripted {
        Err(ApiError::Transport(message.to_string()))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingNavigator(Mutex<Vec<Route>>);

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.0.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, route: Route) {
        self.0.lock().push(route);
    }
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<String>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, _title: &str, message: &str) {
        self.0.lock().push(message.to_string());
    }
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

impl Storage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, ApiError> {
        Err(ApiError::Storage("disk unavailable".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), ApiError> {
        Err(ApiError::Storage("disk unavailable".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), ApiError> {
        Err(ApiError::Storage("disk unavailable".to_string()))
    }

    fn clear(&self) -> Result<(), ApiError> {
        Err(ApiError::Storage("disk unavailable".to_string()))
    }
}

pub struct Harness {
    pub api: ApiClient,
    pub storage: Arc<dyn Storage>,
    pub transport: Arc<ScriptedTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()), script)
    }

    pub fn with_storage(storage: Arc<dyn Storage>, script: Vec<Scripted>) -> Self {
        let transport = Arc::new(ScriptedTransport::new(script));
        let navigator = Arc::new(RecordingNavigator::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let context = AppContext::new(storage.clone())
            .with_navigator(navigator.clone())
            .with_notifier(notifier.clone());
        let api = ApiClient::new(&ClientConfig::new("http://backend.test"), transport.clone(), context);
        Self {
            api,
            storage,
            transport,
            navigator,
            notifier,
        }
    }
}
