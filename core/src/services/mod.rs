//! One service per resource area, each a thin facade over `ApiClient`.
//!
//! Services own nothing but the client handed to them; cloning one is as
//! cheap as cloning the client.

mod alert;
mod auth;
mod face;
mod location;
mod notification;
mod vehicle;

pub use alert::{AlertFeed, AlertService};
pub use auth::AuthService;
pub use face::{AuthorizationSwitch, FaceService};
pub use location::LocationService;
pub use notification::{NotificationService, PushRegistrar};
pub use vehicle::VehicleService;
