//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible fields: `*mut c_char`
//! instead of `String`, boxed slices instead of `Vec`, and enums with
//! explicit discriminants. Conversions live here so `lib.rs` stays focused
//! on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use homeguard_core::envelope::ApiResponse;
use homeguard_core::error::ApiError;
use homeguard_core::http::HttpMethod;
use homeguard_core::types::{Alert, AlertStatus, VehicleStatus};

/// Opaque handle to a `HomeguardClient` plus the bearer token the host
/// wants attached to every request built through it.
pub struct FfiHomeguardClient {
    pub(crate) inner: homeguard_core::HomeguardClient,
    pub(crate) token: Option<String>,
}

/// Copy `s` into a heap C string. Interior NULs cannot be represented, so
/// they are dropped rather than failing the whole conversion.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let mut bytes = s.into().into_bytes();
    bytes.retain(|b| *b != 0);
    CString::new(bytes).unwrap_or_default().into_raw()
}

pub(crate) fn c_string_opt(s: Option<String>) -> *mut c_char {
    s.map(c_string).unwrap_or(std::ptr::null_mut())
}

/// Leak a vector as a raw pointer whose length equals its capacity, so it can
/// be rebuilt later with `Vec::from_raw_parts(ptr, len, len)`.
pub(crate) fn leak_slice<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let ptr = Box::into_raw(items.into_boxed_slice()) as *mut T;
    (ptr, len)
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `hg_build_*` functions. `url` is absolute. The host executes
/// the request and hands the response back through `hg_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: homeguard_core::HttpRequest) -> *mut Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let (headers, headers_len) = leak_slice(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            headers,
            headers_len,
            body: c_string_opt(req.body),
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// The host builds this on its own stack after executing a request. The FFI
/// layer reads but never frees these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Validation = 1,
    Unauthorized = 2,
    Http = 3,
    Transport = 4,
    Deserialization = 5,
    Serialization = 6,
    Storage = 7,
    MissingPushToken = 8,
    Panic = 9,
    NullArg = 10,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Validation { .. } => FfiErrorCode::Validation,
            ApiError::Unauthorized => FfiErrorCode::Unauthorized,
            ApiError::Http { .. } => FfiErrorCode::Http,
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::Deserialization(_) => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::Storage(_) => FfiErrorCode::Storage,
            ApiError::MissingPushToken => FfiErrorCode::MissingPushToken,
        }
    }
}

/// Tells `hg_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a `char*` holding the envelope's `data` as JSON.
    Json = 1,
    VehicleStatus = 2,
    AlertList = 3,
}

#[repr(C)]
pub struct FfiVehicleStatus {
    pub locked: bool,
    pub alarm_active: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub battery_level: f64,
    pub temperature: f64,
    pub last_updated: *mut c_char,
}

impl From<VehicleStatus> for FfiVehicleStatus {
    fn from(s: VehicleStatus) -> Self {
        FfiVehicleStatus {
            locked: s.locked,
            alarm_active: s.alarm_active,
            latitude: s.location.latitude,
            longitude: s.location.longitude,
            battery_level: s.battery_level,
            temperature: s.temperature,
            last_updated: c_string(s.last_updated),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiAlertStatus {
    Sent = 0,
    Delivered = 1,
    Read = 2,
}

impl From<AlertStatus> for FfiAlertStatus {
    fn from(s: AlertStatus) -> Self {
        match s {
            AlertStatus::Sent => FfiAlertStatus::Sent,
            AlertStatus::Delivered => FfiAlertStatus::Delivered,
            AlertStatus::Read => FfiAlertStatus::Read,
        }
    }
}

/// One alert. Nullable fields: `id`, `location`, `user_id`, `email`.
#[repr(C)]
pub struct FfiAlert {
    pub id: *mut c_char,
    pub title: *mut c_char,
    pub body: *mut c_char,
    pub kind: *mut c_char,
    pub timestamp_ms: i64,
    pub location: *mut c_char,
    pub status: FfiAlertStatus,
    pub user_id: *mut c_char,
    pub email: *mut c_char,
}

impl From<Alert> for FfiAlert {
    fn from(a: Alert) -> Self {
        FfiAlert {
            id: c_string_opt(a.id),
            title: c_string(a.title),
            body: c_string(a.body),
            kind: c_string(a.kind),
            timestamp_ms: a.timestamp.timestamp_millis(),
            location: c_string_opt(a.location),
            status: a.status.into(),
            user_id: c_string_opt(a.user_id),
            email: c_string_opt(a.email),
        }
    }
}

/// Alerts most recent first, whichever shape the backend sent.
#[repr(C)]
pub struct FfiAlertList {
    pub items: *mut FfiAlert,
    pub len: u32,
}

/// Result of every parse and validation call.
///
/// `error_code == Ok` means a well-formed envelope came back; `is_success`
/// then says which kind, and `message` carries the envelope's message.
/// A business error (`is_success == false`) has no data. Any other
/// `error_code` means no usable envelope: `error_message` explains why and
/// `http_status` is set for `Http` and `Unauthorized`.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub is_success: bool,
    pub message: *mut c_char,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn empty(error_code: FfiErrorCode) -> Self {
        FfiResult {
            error_code,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            is_success: false,
            message: std::ptr::null_mut(),
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }
    }

    /// Convert an envelope, letting `payload` turn success data into a
    /// tagged pointer.
    pub(crate) fn from_envelope<T>(
        envelope: ApiResponse<T>,
        payload: impl FnOnce(T) -> (FfiDataTag, *mut c_void),
    ) -> *mut Self {
        let mut result = FfiResult::empty(FfiErrorCode::Ok);
        match envelope {
            ApiResponse::Success { message, data } => {
                result.is_success = true;
                result.message = c_string(message);
                let (tag, ptr) = payload(data);
                result.data_tag = tag;
                result.data = ptr;
            }
            ApiResponse::Error { message, .. } => {
                result.message = c_string(message);
            }
        }
        Box::into_raw(Box::new(result))
    }

    /// Success with no payload, used by the validation entry points.
    pub(crate) fn ok_empty() -> *mut Self {
        let mut result = FfiResult::empty(FfiErrorCode::Ok);
        result.is_success = true;
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let mut result = FfiResult::empty(FfiErrorCode::from(&err));
        result.http_status = err.status().unwrap_or(0);
        result.error_message = c_string(err.message());
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        let mut result = FfiResult::empty(FfiErrorCode::NullArg);
        result.error_message = c_string(format!("null argument: {name}"));
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        let mut result = FfiResult::empty(FfiErrorCode::Panic);
        result.error_message = c_string(msg);
        Box::into_raw(Box::new(result))
    }
}

pub(crate) fn json_payload(json: String) -> (FfiDataTag, *mut c_void) {
    (FfiDataTag::Json, c_string(json) as *mut c_void)
}

pub(crate) fn vehicle_payload(status: VehicleStatus) -> (FfiDataTag, *mut c_void) {
    let boxed = Box::new(FfiVehicleStatus::from(status));
    (FfiDataTag::VehicleStatus, Box::into_raw(boxed) as *mut c_void)
}

pub(crate) fn alert_list_payload(alerts: Vec<Alert>) -> (FfiDataTag, *mut c_void) {
    let items: Vec<FfiAlert> = alerts.into_iter().map(FfiAlert::from).collect();
    let (items, len) = leak_slice(items);
    let boxed = Box::new(FfiAlertList { items, len });
    (FfiDataTag::AlertList, Box::into_raw(boxed) as *mut c_void)
}
