//! Push-notification device registration.
//!
//! The host platform owns the OS permission prompt and the push token; it is
//! reached through [`PushRegistrar`]. Every backend call here is best-effort
//! and wrapped in the service's [`RetryPolicy`]. Attempts run quietly and a
//! single alert is raised once the policy gives up.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::retry::RetryPolicy;
use crate::storage::{PERMISSION_STATUS_KEY, PUSH_TOKEN_KEY};
use crate::types::{
    DeviceInfo, DeviceList, PermissionState, PermissionStatus, RegisterDeviceRequest,
    UnregisterDeviceRequest, UpdatePermissionRequest,
};

/// Host side of push notifications.
pub trait PushRegistrar: Send + Sync {
    /// Prompt for (or re-read) the notification permission.
    fn request_permission(&self) -> PermissionStatus;

    /// The device push token, or `None` when the platform cannot issue one.
    fn fetch_push_token(&self) -> Option<String>;

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::default()
    }
}

#[derive(Clone)]
pub struct NotificationService {
    api: ApiClient,
    registrar: Arc<dyn PushRegistrar>,
    retry: RetryPolicy,
}

impl NotificationService {
    pub fn new(api: ApiClient, registrar: Arc<dyn PushRegistrar>) -> Self {
        Self {
            api,
            registrar,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // --- device bookkeeping ---

    /// The last stored permission state. An unreadable entry counts as none.
    pub fn stored_permission(&self) -> Result<Option<PermissionState>, ApiError> {
        let Some(raw) = self.api.storage().get(PERMISSION_STATUS_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable permission state");
                Ok(None)
            }
        }
    }

    /// Ask the host for permission and persist the answer.
    pub fn request_permission(&self) -> Result<PermissionState, ApiError> {
        let status = self.registrar.request_permission();
        let state = PermissionState {
            status,
            push_token: self.cached_push_token()?,
            timestamp: Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_string(&state).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.api.storage().set(PERMISSION_STATUS_KEY, &json)?;
        info!(status = %status, "notification permission recorded");
        Ok(state)
    }

    /// The cached push token, fetching and caching one from the host when
    /// none is stored yet.
    pub fn push_token(&self) -> Result<Option<String>, ApiError> {
        if let Some(token) = self.cached_push_token()? {
            return Ok(Some(token));
        }
        match self.registrar.fetch_push_token() {
            Some(token) if !token.is_empty() => {
                self.api.storage().set(PUSH_TOKEN_KEY, &token)?;
                Ok(Some(token))
            }
            _ => {
                warn!("host could not provide a push token");
                Ok(None)
            }
        }
    }

    pub fn clear_notification_data(&self) -> Result<(), ApiError> {
        self.api.storage().remove(PERMISSION_STATUS_KEY)?;
        self.api.storage().remove(PUSH_TOKEN_KEY)
    }

    fn cached_push_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .api
            .storage()
            .get(PUSH_TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    // --- backend calls ---

    /// Register this device for `user_id`. Uses the stored permission, or
    /// prompts when there is none; fails with `MissingPushToken` when the
    /// host cannot supply a token.
    pub fn register_device(&self, user_id: &str) -> Result<ApiResponse<Value>, ApiError> {
        let permission = match self.stored_permission()? {
            Some(state) => state,
            None => self.request_permission()?,
        };
        let fcm_token = self.push_token()?.ok_or(ApiError::MissingPushToken)?;
        let input = RegisterDeviceRequest {
            user_id: user_id.to_string(),
            fcm_token,
            device_info: self.registrar.device_info(),
            permission_status: permission.status,
        };
        let request = self.api.endpoints().build_register_device(&input)?;
        self.send_with_retry("register device", request)
    }

    /// Tell the backend this device no longer wants pushes. Without a stored
    /// push token there is nothing to unregister and `None` is returned.
    pub fn unregister_device(&self, user_id: &str) -> Result<Option<ApiResponse<Value>>, ApiError> {
        let Some(fcm_token) = self.cached_push_token()? else {
            debug!("no push token stored, skipping unregister");
            return Ok(None);
        };
        let input = UnregisterDeviceRequest {
            user_id: user_id.to_string(),
            fcm_token,
        };
        let request = self.api.endpoints().build_unregister_device(&input)?;
        self.send_with_retry("unregister device", request).map(Some)
    }

    pub fn update_permission_status(
        &self,
        user_id: &str,
        permission_status: PermissionStatus,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let fcm_token = self.push_token()?.ok_or(ApiError::MissingPushToken)?;
        let input = UpdatePermissionRequest {
            user_id: user_id.to_string(),
            fcm_token,
            permission_status,
        };
        let request = self.api.endpoints().build_update_permission(&input)?;
        self.send_with_retry("update permission", request)
    }

    pub fn list_devices(&self, user_id: &str) -> Result<ApiResponse<DeviceList>, ApiError> {
        let request = self.api.endpoints().build_list_devices(user_id)?;
        self.send_with_retry("list devices", request)
    }

    fn send_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let result = self.retry.run(|attempt| {
            debug!(operation, attempt, "device call");
            self.api.send_quietly(request.clone())
        });
        if let Err(err) = &result {
            warn!(operation, error = %err, "device call failed");
            self.api.alert(err);
        }
        result
    }
}
