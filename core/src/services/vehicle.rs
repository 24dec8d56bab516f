use crate::api::ApiClient;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::types::{
    Location, LocationData, LocationHistory, UpdateLocationRequest, UpdateVehicleStatusRequest,
    VehicleStatus, VehicleStatusData,
};

/// Vehicle state and its location trail.
///
/// Updates replace the whole status object; there is no partial update.
/// Calls are not sequenced against each other: two toggles issued from
/// different threads each send the status they were given, and the backend
/// keeps whichever lands last. Callers that care should feed the status
/// returned by one toggle into the next.
#[derive(Clone)]
pub struct VehicleService {
    api: ApiClient,
}

impl VehicleService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn get_vehicle_status(&self) -> Result<ApiResponse<VehicleStatusData>, ApiError> {
        self.api.send(self.api.endpoints().build_vehicle_status())
    }

    pub fn update_vehicle_status(
        &self,
        status: &VehicleStatus,
    ) -> Result<ApiResponse<VehicleStatusData>, ApiError> {
        let input = UpdateVehicleStatusRequest::from(status);
        self.api
            .send(self.api.endpoints().build_update_vehicle_status(&input)?)
    }

    pub fn toggle_lock(&self, current: &VehicleStatus) -> Result<ApiResponse<VehicleStatusData>, ApiError> {
        self.update_vehicle_status(&current.with_locked(!current.locked))
    }

    pub fn toggle_alarm(&self, current: &VehicleStatus) -> Result<ApiResponse<VehicleStatusData>, ApiError> {
        self.update_vehicle_status(&current.with_alarm_active(!current.alarm_active))
    }

    pub fn get_location_history(&self) -> Result<ApiResponse<LocationHistory>, ApiError> {
        self.api.send(self.api.endpoints().build_location_history())
    }

    pub fn update_location(&self, location: Location) -> Result<ApiResponse<LocationData>, ApiError> {
        let input = UpdateLocationRequest { location };
        self.api.send(self.api.endpoints().build_update_location(&input)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::http::HttpMethod;
    use crate::testing::{Harness, ScriptedTransport};

    const STATUS: &str = r#"{"status":"success","message":"","data":{"status":{
        "locked":false,"alarm_active":true,"location":{"latitude":51.5,"longitude":-0.12},
        "battery_level":80,"temperature":21.0,"last_updated":"2024-05-01T10:00:00Z"}}}"#;

    fn current() -> VehicleStatus {
        VehicleStatus {
            locked: true,
            alarm_active: true,
            location: Location {
                latitude: 51.5,
                longitude: -0.12,
            },
            battery_level: 80.0,
            temperature: 21.0,
            last_updated: "2024-05-01T09:00:00Z".to_string(),
        }
    }

    fn sent_body(h: &Harness) -> Value {
        serde_json::from_str(h.transport.requests()[0].body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn toggle_lock_sends_whole_status_with_one_flip() {
        let h = Harness::new(vec![ScriptedTransport::ok(STATUS)]);
        let resp = VehicleService::new(h.api.clone()).toggle_lock(&current()).unwrap();
        assert!(!resp.data().unwrap().status.locked);

        let body = sent_body(&h);
        assert_eq!(body["locked"], false);
        assert_eq!(body["alarm_active"], true);
        assert_eq!(body["battery_level"], 80.0);
        assert_eq!(body["location"]["latitude"], 51.5);
        assert!(body.get("last_updated").is_none());
        assert_eq!(h.transport.requests()[0].method, HttpMethod::Post);
    }

    #[test]
    fn toggle_alarm_leaves_lock_alone() {
        let h = Harness::new(vec![ScriptedTransport::ok(STATUS)]);
        VehicleService::new(h.api.clone()).toggle_alarm(&current()).unwrap();

        let body = sent_body(&h);
        assert_eq!(body["locked"], true);
        assert_eq!(body["alarm_active"], false);
    }

    #[test]
    fn location_history_accepts_keyed_map() {
        let h = Harness::new(vec![ScriptedTransport::ok(
            r#"{"status":"success","message":"","data":{"history":{
                "a":{"location":{"latitude":1.0,"longitude":1.0},"timestamp":"2024-05-01T08:00:00Z"},
                "b":{"location":{"latitude":2.0,"longitude":2.0},"timestamp":"2024-05-01T09:00:00Z"}
            }}}"#,
        )]);
        let resp = VehicleService::new(h.api.clone()).get_location_history().unwrap();
        let ids: Vec<_> = resp
            .data()
            .unwrap()
            .history
            .iter()
            .map(|f| f.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert!(h.transport.requests()[0].url.ends_with("/vehicle/location/history"));
    }

    #[test]
    fn update_location_wraps_the_fix() {
        let h = Harness::new(vec![ScriptedTransport::ok(
            r#"{"status":"success","message":"","data":{"location":{
                "id":"l1","location":{"latitude":3.0,"longitude":4.0},"timestamp":1714557600000}}}"#,
        )]);
        let resp = VehicleService::new(h.api.clone())
            .update_location(Location {
                latitude: 3.0,
                longitude: 4.0,
            })
            .unwrap();
        assert_eq!(resp.data().unwrap().location.id.as_deref(), Some("l1"));
        assert_eq!(sent_body(&h)["location"]["longitude"], 4.0);
    }

    #[test]
    fn server_failure_is_not_retried() {
        let h = Harness::new(vec![
            ScriptedTransport::status(503, r#"{"status":"error","message":"busy","data":{}}"#),
            ScriptedTransport::ok(STATUS),
        ]);
        let err = VehicleService::new(h.api.clone()).toggle_lock(&current()).unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(h.transport.requests().len(), 1);
    }
}
