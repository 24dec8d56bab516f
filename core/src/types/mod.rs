//! Wire DTOs for the homeguard backend.
//!
//! # Design
//! These types mirror the backend's JSON but are defined independently of
//! the mock-server crate; integration tests catch schema drift. Collections
//! the backend has shipped both as a keyed map and as an array go through
//! `KeyedOrList` at the deserialization boundary and come out as plain,
//! ordered `Vec`s.

mod alert;
mod auth;
mod device;
mod face;
mod vehicle;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

pub use alert::{Alert, AlertHistory, AlertStatus, PushAlertData, PushAlertRequest};
pub use auth::{CurrentUserData, LoginData, LoginRequest, RegisterData, RegisterRequest, User};
pub use device::{
    DeviceInfo, DeviceList, DeviceRecord, PermissionState, PermissionStatus, RegisterDeviceRequest,
    UnregisterDeviceRequest, UpdatePermissionRequest,
};
pub use face::{
    Face, FaceData, FaceList, Relationship, RegisterFaceRequest, UpdateAuthorizationRequest,
    VerifyFaceData, VerifyFaceRequest,
};
pub use vehicle::{
    Location, LocationData, LocationFix, LocationHistory, UpdateLocationRequest,
    UpdateVehicleStatusRequest, VehicleStatus, VehicleStatusData,
};

/// A collection that arrives either as `{ "<key>": item, ... }` or `[item, ...]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeyedOrList<T> {
    List(Vec<T>),
    Keyed(BTreeMap<String, T>),
}

impl<T> KeyedOrList<T> {
    /// Flatten to `(key, item)` pairs; list items have no key.
    fn into_entries(self) -> Vec<(Option<String>, T)> {
        match self {
            KeyedOrList::List(items) => items.into_iter().map(|item| (None, item)).collect(),
            KeyedOrList::Keyed(map) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
        }
    }
}

/// Deserialize a map-or-list (or `null`) into keyed entries.
fn keyed_entries<'de, D, T>(deserializer: D) -> Result<Vec<(Option<String>, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<KeyedOrList<T>>::deserialize(deserializer)?
        .map(KeyedOrList::into_entries)
        .unwrap_or_default())
}

/// Timestamps arrive as RFC 3339 strings or as epoch milliseconds; they are
/// always written back as RFC 3339 with millisecond precision.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Millis(ms) => from_millis(ms).ok_or_else(|| D::Error::custom("timestamp out of range")),
            Raw::Float(ms) => {
                from_millis(ms as i64).ok_or_else(|| D::Error::custom("timestamp out of range"))
            }
            Raw::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| D::Error::custom(format!("invalid timestamp {text:?}: {e}"))),
        }
    }

    fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(ms).single()
    }
}
