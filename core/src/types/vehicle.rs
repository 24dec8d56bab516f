use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{keyed_entries, timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Full vehicle state. Updates always send the whole object back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub locked: bool,
    pub alarm_active: bool,
    pub location: Location,
    pub battery_level: f64,
    pub temperature: f64,
    #[serde(default)]
    pub last_updated: String,
}

impl VehicleStatus {
    pub fn with_locked(&self, locked: bool) -> Self {
        Self { locked, ..self.clone() }
    }

    pub fn with_alarm_active(&self, alarm_active: bool) -> Self {
        Self {
            alarm_active,
            ..self.clone()
        }
    }
}

/// `last_updated` is server-owned and never sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateVehicleStatusRequest {
    pub locked: bool,
    pub alarm_active: bool,
    pub location: Location,
    pub battery_level: f64,
    pub temperature: f64,
}

impl From<&VehicleStatus> for UpdateVehicleStatusRequest {
    fn from(status: &VehicleStatus) -> Self {
        Self {
            locked: status.locked,
            alarm_active: status.alarm_active,
            location: status.location,
            battery_level: status.battery_level,
            temperature: status.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatusData {
    pub status: VehicleStatus,
}

/// One recorded position of the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location: Location,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Location history, most recent fix first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationHistory {
    #[serde(default, deserialize_with = "fixes_recent_first")]
    pub history: Vec<LocationFix>,
}

fn fixes_recent_first<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<LocationFix>, D::Error> {
    let mut fixes: Vec<LocationFix> = keyed_entries::<_, LocationFix>(d)?
        .into_iter()
        .map(|(key, mut fix)| {
            if fix.id.is_none() {
                fix.id = key;
            }
            fix
        })
        .collect();
    fixes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
    Ok(fixes)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLocationRequest {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub location: LocationFix,
}
