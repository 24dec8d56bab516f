//! Client core for the home-security companion app.
//!
//! # Overview
//! Talks to the Homeguard backend (accounts, face recognition, security
//! alerts, vehicle telemetry, push-device registration) through one typed
//! envelope, `ApiResponse<T>`, and keeps the signed-in session persisted on
//! the device.
//!
//! # Design
//! - `HomeguardClient` is the sans-IO half: `build_*` produces an
//!   `HttpRequest`, `parse` turns an `HttpResponse` into an envelope. The FFI
//!   crate exposes only this half so a mobile host can do its own I/O.
//! - `ApiClient` executes requests through a `Transport` and applies the
//!   interceptors: bearer attachment before sending, 401 reset and error
//!   alerting after.
//! - Services (`services::*`) are constructed from an `ApiClient`; shared
//!   state lives in the `AppContext` it carries, never in globals.
//! - Types use owned `String` / `Vec` fields to simplify FFI mapping. DTOs
//!   are defined independently from the mock-server crate; integration tests
//!   catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod host;
pub mod http;
pub mod image;
pub mod retry;
pub mod services;
pub mod session;
pub mod storage;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

pub use api::ApiClient;
pub use client::HomeguardClient;
pub use config::ClientConfig;
pub use context::AppContext;
pub use envelope::{ApiResponse, ResponseStatus};
pub use error::ApiError;
pub use host::{Navigator, Notifier, Route};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
#[cfg(feature = "ureq")]
pub use http::UreqTransport;
pub use retry::RetryPolicy;
pub use services::{
    AlertFeed, AlertService, AuthService, AuthorizationSwitch, FaceService, LocationService,
    NotificationService, PushRegistrar, VehicleService,
};
pub use session::{Session, SessionStore};
pub use storage::{FileStorage, MemoryStorage, Storage};
