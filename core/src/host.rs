//! Callbacks into the embedding UI: navigation and user-visible alerts.

use tracing::{debug, warn};

/// Navigation targets the core can force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Home,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/(auth)/sign-in",
            Route::Home => "/(protected)/(tabs)/home",
        }
    }
}

pub trait Navigator: Send + Sync {
    /// Replace the current screen stack with `route`.
    fn replace(&self, route: Route);
}

pub trait Notifier: Send + Sync {
    /// Show one user-visible alert.
    fn alert(&self, title: &str, message: &str);
}

/// Navigator for hosts without routing (CLIs, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn replace(&self, route: Route) {
        debug!(route = route.path(), "navigation requested without a navigator");
    }
}

/// Notifier that writes alerts to the log instead of the screen.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, title: &str, message: &str) {
        warn!(title, message, "user alert");
    }
}
