//! The explicit application context handed to `ApiClient`.

use std::sync::Arc;

use crate::host::{LogNotifier, Navigator, Notifier, NullNavigator};
use crate::session::SessionStore;
use crate::storage::Storage;

/// Shared state and host callbacks. Cloning is cheap; every clone refers to
/// the same storage, session and host.
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<dyn Storage>,
    pub session: SessionStore,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            session: SessionStore::new(storage.clone()),
            storage,
            navigator: Arc::new(NullNavigator),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
