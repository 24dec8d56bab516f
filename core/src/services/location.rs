use crate::api::ApiClient;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::types::LocationData;

/// The vehicle's current position.
#[derive(Clone)]
pub struct LocationService {
    api: ApiClient,
}

impl LocationService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn get_location(&self) -> Result<ApiResponse<LocationData>, ApiError> {
        self.api.send(self.api.endpoints().build_location())
    }
}
