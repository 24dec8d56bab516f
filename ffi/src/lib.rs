//! C-ABI wrapper around `homeguard-core`.
//!
//! # Overview
//! Lets a native mobile shell (Swift, Kotlin/JNI, anything with a C FFI)
//! build backend requests and parse backend envelopes without linking an
//! HTTP stack or serde. The host owns the network round-trip, the session
//! storage and the UI; this layer is sans-IO.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the boundary.
//! - `hg_build_*` mirrors the core builders 1:1 and attaches the bearer
//!   token set with `hg_client_set_token`.
//! - Parsing is generic (`hg_parse_response` hands back the envelope's data
//!   as JSON) except for the two payloads a host renders natively: vehicle
//!   status and the normalized alert history.
//! - The caller owns every returned pointer and releases it with the
//!   matching `hg_free_*` function.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use homeguard_core::error::ApiError;
use homeguard_core::http::{HttpRequest, HttpResponse};
use homeguard_core::types::{
    AlertHistory, Location, LoginRequest, PermissionStatus, PushAlertRequest, RegisterDeviceRequest,
    RegisterFaceRequest, RegisterRequest, Relationship, UnregisterDeviceRequest,
    UpdateAuthorizationRequest, UpdateLocationRequest, UpdatePermissionRequest,
    UpdateVehicleStatusRequest, VehicleStatusData, VerifyFaceRequest,
};
use homeguard_core::{image, validate, ClientConfig, HomeguardClient};
use serde_json::Value;

use types::*;

/// Borrow a C string as UTF-8. Null and invalid UTF-8 both yield `None`.
fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Attach the client's token and hand the request to C. Builder errors
/// (serialization, unescapable path parts) come back as null.
fn finish(client: &FfiHomeguardClient, built: Result<HttpRequest, ApiError>) -> *mut FfiHttpRequest {
    match built {
        Ok(mut req) => {
            if let Some(token) = client.token.as_deref() {
                client.inner.authorize(&mut req, token);
            }
            FfiHttpRequest::from_core(req)
        }
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_permission(raw: &str) -> PermissionStatus {
    serde_json::from_value(Value::String(raw.to_ascii_lowercase())).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`, carrying the same default headers
/// as the executing client.
///
/// Returns null if `base_url` is null or not UTF-8. Free with
/// `hg_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn hg_client_new(base_url: *const c_char) -> *mut FfiHomeguardClient {
    catch_unwind(|| {
        let Some(url) = str_arg(base_url) else {
            return std::ptr::null_mut();
        };
        Box::into_raw(Box::new(FfiHomeguardClient {
            inner: HomeguardClient::from_config(&ClientConfig::new(url)),
            token: None,
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `hg_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn hg_client_free(client: *mut FfiHomeguardClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Set the bearer token attached to every request built afterwards. A null
/// or empty `token` clears it, which is what the host does after sign-out
/// or a 401. Returns false only if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn hg_client_set_token(client: *mut FfiHomeguardClient, token: *const c_char) -> bool {
    catch_unwind(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        client.token = str_arg(token).filter(|t| !t.is_empty()).map(str::to_string);
        true
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// `POST /auth/register`. Returns null if any argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_register(
    client: *const FfiHomeguardClient,
    name: *const c_char,
    email: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(name), Some(email), Some(password)) = (str_arg(name), str_arg(email), str_arg(password)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        finish(client, client.inner.build_register(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `POST /auth/login`. Returns null if any argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_login(
    client: *const FfiHomeguardClient,
    email: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(email), Some(password)) = (str_arg(email), str_arg(password)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        finish(client, client.inner.build_login(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_current_user(client: *const FfiHomeguardClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        finish(client, Ok(client.inner.build_current_user()))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `POST /faces/register`. `relationship` is one of family, friend,
/// employee, neighbor or other (case-insensitive); anything else returns
/// null, as does a null argument.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_register_face(
    client: *const FfiHomeguardClient,
    name: *const c_char,
    relationship: *const c_char,
    image: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(name), Some(relationship), Some(image)) =
            (str_arg(name), str_arg(relationship), str_arg(image))
        else {
            return std::ptr::null_mut();
        };
        let Ok(relationship) = relationship.parse::<Relationship>() else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = RegisterFaceRequest {
            name: name.to_string(),
            relationship,
            image: image.to_string(),
        };
        finish(client, client.inner.build_register_face(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_verify_face(
    client: *const FfiHomeguardClient,
    image: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(image) = str_arg(image) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = VerifyFaceRequest {
            image: image.to_string(),
        };
        finish(client, client.inner.build_verify_face(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_list_faces(client: *const FfiHomeguardClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        finish(client, Ok(client.inner.build_list_faces()))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `PUT /faces/{face_id}/authorization`. `face_id` is percent-escaped.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_update_authorization(
    client: *const FfiHomeguardClient,
    face_id: *const c_char,
    is_authorized: bool,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(face_id) = str_arg(face_id) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = UpdateAuthorizationRequest { is_authorized };
        finish(client, client.inner.build_update_authorization(face_id, &input))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `POST /alerts/push`. The alert is passed as JSON in the backend's own
/// shape (`title`, `body`, `token`, `type`, `timestamp`, optional
/// `location` and `face_details`). Returns null if it does not parse.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_push_alert(
    client: *const FfiHomeguardClient,
    alert_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(raw) = str_arg(alert_json) else {
            return std::ptr::null_mut();
        };
        let Ok(input) = serde_json::from_str::<PushAlertRequest>(raw) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        finish(client, client.inner.build_push_alert(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_alert_history(client: *const FfiHomeguardClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        finish(client, Ok(client.inner.build_alert_history()))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_vehicle_status(client: *const FfiHomeguardClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        finish(client, Ok(client.inner.build_vehicle_status()))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `POST /vehicle/status` with the whole status. `last_updated` is ignored;
/// the backend owns it. Typically the host copies the status it last parsed
/// and flips `locked` or `alarm_active`.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_update_vehicle_status(
    client: *const FfiHomeguardClient,
    status: *const FfiVehicleStatus,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() || status.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let status = unsafe { &*status };
        let input = UpdateVehicleStatusRequest {
            locked: status.locked,
            alarm_active: status.alarm_active,
            location: Location {
                latitude: status.latitude,
                longitude: status.longitude,
            },
            battery_level: status.battery_level,
            temperature: status.temperature,
        };
        finish(client, client.inner.build_update_vehicle_status(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_location(client: *const FfiHomeguardClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        finish(client, Ok(client.inner.build_location()))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_location_history(client: *const FfiHomeguardClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        finish(client, Ok(client.inner.build_location_history()))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_update_location(
    client: *const FfiHomeguardClient,
    latitude: f64,
    longitude: f64,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let input = UpdateLocationRequest {
            location: Location { latitude, longitude },
        };
        finish(client, client.inner.build_update_location(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `POST /api/user-device/register`. `permission_status` is granted,
/// denied or undetermined; any other value is sent as unknown. Device info
/// describes the library build.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_register_device(
    client: *const FfiHomeguardClient,
    user_id: *const c_char,
    fcm_token: *const c_char,
    permission_status: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(user_id), Some(fcm_token), Some(permission)) =
            (str_arg(user_id), str_arg(fcm_token), str_arg(permission_status))
        else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = RegisterDeviceRequest {
            user_id: user_id.to_string(),
            fcm_token: fcm_token.to_string(),
            device_info: Default::default(),
            permission_status: parse_permission(permission),
        };
        finish(client, client.inner.build_register_device(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_update_permission(
    client: *const FfiHomeguardClient,
    user_id: *const c_char,
    fcm_token: *const c_char,
    permission_status: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(user_id), Some(fcm_token), Some(permission)) =
            (str_arg(user_id), str_arg(fcm_token), str_arg(permission_status))
        else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = UpdatePermissionRequest {
            user_id: user_id.to_string(),
            fcm_token: fcm_token.to_string(),
            permission_status: parse_permission(permission),
        };
        finish(client, client.inner.build_update_permission(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_build_unregister_device(
    client: *const FfiHomeguardClient,
    user_id: *const c_char,
    fcm_token: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(user_id), Some(fcm_token)) = (str_arg(user_id), str_arg(fcm_token)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = UnregisterDeviceRequest {
            user_id: user_id.to_string(),
            fcm_token: fcm_token.to_string(),
        };
        finish(client, client.inner.build_unregister_device(&input))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// `GET /api/user-device/list?user_id=...`, with `user_id` query-escaped.
#[unsafe(no_mangle)]
pub extern "C" fn hg_build_list_devices(
    client: *const FfiHomeguardClient,
    user_id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(user_id) = str_arg(user_id) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        finish(client, client.inner.build_list_devices(user_id))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body: str_arg(resp.body).unwrap_or("").to_string(),
    }
}

/// Shared null checks and conversion for the parse entry points.
fn with_response(
    client: *const FfiHomeguardClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&HomeguardClient, &HttpResponse) -> *mut FfiResult,
) -> *mut FfiResult {
    if client.is_null() {
        return FfiResult::null_arg("client");
    }
    if response.is_null() {
        return FfiResult::null_arg("response");
    }
    let client = unsafe { &*client };
    let resp = ffi_response_to_core(unsafe { &*response });
    parse(&client.inner, &resp)
}

/// Parse any endpoint's response. On a success envelope `data_tag` is
/// `Json` and `data` is the envelope's `data` re-serialized as a C string.
#[unsafe(no_mangle)]
pub extern "C" fn hg_parse_response(
    client: *const FfiHomeguardClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        with_response(client, response, |client, resp| {
            match client.parse::<Value>(resp) {
                Ok(envelope) => FfiResult::from_envelope(envelope, |data| json_payload(data.to_string())),
                Err(e) => FfiResult::from_error(e),
            }
        })
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in hg_parse_response"))
}

/// Parse a vehicle status response (`GET` or `POST /vehicle/status`).
/// A success envelope carries an `FfiVehicleStatus`.
#[unsafe(no_mangle)]
pub extern "C" fn hg_parse_vehicle_status(
    client: *const FfiHomeguardClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        with_response(client, response, |client, resp| {
            match client.parse::<VehicleStatusData>(resp) {
                Ok(envelope) => FfiResult::from_envelope(envelope, |data| vehicle_payload(data.status)),
                Err(e) => FfiResult::from_error(e),
            }
        })
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in hg_parse_vehicle_status"))
}

/// Parse `GET /alerts/history`. Keyed-map and list payloads both come out
/// as an `FfiAlertList` ordered most recent first.
#[unsafe(no_mangle)]
pub extern "C" fn hg_parse_alert_history(
    client: *const FfiHomeguardClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        with_response(client, response, |client, resp| {
            match client.parse::<AlertHistory>(resp) {
                Ok(envelope) => FfiResult::from_envelope(envelope, |data| alert_list_payload(data.alerts)),
                Err(e) => FfiResult::from_error(e),
            }
        })
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in hg_parse_alert_history"))
}

// ---------------------------------------------------------------------------
// Validation and helpers
// ---------------------------------------------------------------------------

fn validation_result(outcome: Result<(), ApiError>) -> *mut FfiResult {
    match outcome {
        Ok(()) => FfiResult::ok_empty(),
        Err(e) => FfiResult::from_error(e),
    }
}

/// Check sign-up input before building the request. `error_code` is
/// `Validation` with the first failing field's message, or `Ok`.
#[unsafe(no_mangle)]
pub extern "C" fn hg_validate_registration(
    name: *const c_char,
    email: *const c_char,
    password: *const c_char,
) -> *mut FfiResult {
    catch_unwind(|| {
        let (Some(name), Some(email), Some(password)) = (str_arg(name), str_arg(email), str_arg(password)) else {
            return FfiResult::null_arg("name, email or password");
        };
        validation_result(validate::registration(name, email, password))
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in hg_validate_registration"))
}

#[unsafe(no_mangle)]
pub extern "C" fn hg_validate_login(email: *const c_char, password: *const c_char) -> *mut FfiResult {
    catch_unwind(|| {
        let (Some(email), Some(password)) = (str_arg(email), str_arg(password)) else {
            return FfiResult::null_arg("email or password");
        };
        validation_result(validate::login(email, password))
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in hg_validate_login"))
}

/// Check that `image` is a base64 `data:image/...` URI.
#[unsafe(no_mangle)]
pub extern "C" fn hg_validate_image(image: *const c_char) -> *mut FfiResult {
    catch_unwind(|| {
        let Some(image) = str_arg(image) else {
            return FfiResult::null_arg("image");
        };
        validation_result(validate::image_data_uri(image))
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in hg_validate_image"))
}

/// Encode `len` bytes of a captured image as a data URI. A null `mime`
/// means JPEG. Returns null if `bytes` is null and `len` is not zero.
/// Free with `hg_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn hg_image_data_uri(bytes: *const u8, len: usize, mime: *const c_char) -> *mut c_char {
    catch_unwind(|| {
        let data: &[u8] = if len == 0 {
            &[]
        } else if bytes.is_null() {
            return std::ptr::null_mut();
        } else {
            unsafe { std::slice::from_raw_parts(bytes, len) }
        };
        let uri = match str_arg(mime) {
            Some(mime) => image::to_data_uri(data, mime),
            None => image::jpeg_data_uri(data),
        };
        c_string(uri)
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_c_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Free a request returned by any `hg_build_*` function. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn hg_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let len = req.headers_len as usize;
            let headers = unsafe { Vec::from_raw_parts(req.headers, len, len) };
            for h in headers {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free a result returned by any `hg_parse_*` or `hg_validate_*`
/// function. Safe to call with null. `data_tag` says what `data` holds.
#[unsafe(no_mangle)]
pub extern "C" fn hg_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::None => {}
            FfiDataTag::Json => free_c_string(result.data as *mut c_char),
            FfiDataTag::VehicleStatus => {
                let status = unsafe { Box::from_raw(result.data as *mut FfiVehicleStatus) };
                free_c_string(status.last_updated);
            }
            FfiDataTag::AlertList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiAlertList) };
                if !list.items.is_null() && list.len > 0 {
                    let len = list.len as usize;
                    let items = unsafe { Vec::from_raw_parts(list.items, len, len) };
                    for alert in items {
                        free_ffi_alert_fields(&alert);
                    }
                }
            }
        }
    });
}

fn free_ffi_alert_fields(alert: &FfiAlert) {
    free_c_string(alert.id);
    free_c_string(alert.title);
    free_c_string(alert.body);
    free_c_string(alert.kind);
    free_c_string(alert.location);
    free_c_string(alert.user_id);
    free_c_string(alert.email);
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn hg_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}
