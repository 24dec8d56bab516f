use crate::api::ApiClient;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::types::{
    FaceData, FaceList, RegisterFaceRequest, UpdateAuthorizationRequest, VerifyFaceData,
    VerifyFaceRequest,
};
use crate::validate;

/// Face registration, recognition and the authorized-faces list.
///
/// Images must already be `data:image/...;base64,` URIs. Use
/// [`crate::image::to_data_uri`] to build one from raw bytes.
#[derive(Clone)]
pub struct FaceService {
    api: ApiClient,
}

impl FaceService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn register_face(&self, input: &RegisterFaceRequest) -> Result<ApiResponse<FaceData>, ApiError> {
        validate::name(&input.name)?;
        validate::image_data_uri(&input.image)?;
        self.api.send(self.api.endpoints().build_register_face(input)?)
    }

    /// `match == false` comes back as a success envelope, not an error.
    pub fn verify_face(&self, input: &VerifyFaceRequest) -> Result<ApiResponse<VerifyFaceData>, ApiError> {
        validate::image_data_uri(&input.image)?;
        self.api.send(self.api.endpoints().build_verify_face(input)?)
    }

    pub fn list_faces(&self) -> Result<ApiResponse<FaceList>, ApiError> {
        self.api.send(self.api.endpoints().build_list_faces())
    }

    pub fn update_authorization(
        &self,
        face_id: &str,
        is_authorized: bool,
    ) -> Result<ApiResponse<FaceData>, ApiError> {
        let input = UpdateAuthorizationRequest { is_authorized };
        self.api
            .send(self.api.endpoints().build_update_authorization(face_id, &input)?)
    }
}

/// The per-face authorization switch. Its value only changes once the
/// backend has accepted the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationSwitch {
    face_id: String,
    value: bool,
}

impl AuthorizationSwitch {
    pub fn new(face_id: impl Into<String>, value: bool) -> Self {
        Self {
            face_id: face_id.into(),
            value,
        }
    }

    pub fn face_id(&self) -> &str {
        &self.face_id
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// Ask the backend to flip the flag and return the resulting value.
    /// An error envelope or a failed call leaves the switch where it was.
    pub fn toggle(&mut self, faces: &FaceService) -> Result<bool, ApiError> {
        let target = !self.value;
        if faces.update_authorization(&self.face_id, target)?.is_success() {
            self.value = target;
        }
        Ok(self.value)
    }
}
