//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain data. `HomeguardClient` builds
//! `HttpRequest` values and parses `HttpResponse` values without touching the
//! network; whoever owns the I/O (the `ApiClient` through a `Transport`, or a
//! mobile host through the FFI crate) executes the round-trip in between.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: the client joins its base URL and the endpoint path
/// when building the request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value under the same name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP round-trip.
///
/// Implementations must return non-2xx responses as `Ok` data; only failures
/// where no response was received (connect error, timeout, unreadable body)
/// are `Err`, and those use `ApiError::Transport`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use std::time::Duration;

    use super::{HttpMethod, HttpRequest, HttpResponse, Transport};
    use crate::config::ClientConfig;
    use crate::error::ApiError;

    /// Blocking transport backed by a `ureq` agent.
    ///
    /// Status-code-as-error is disabled so 4xx/5xx responses come back as data
    /// and the response interceptor decides what they mean.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new(timeout: Duration) -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(Some(timeout))
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn from_config(config: &ClientConfig) -> Self {
            Self::new(config.timeout)
        }
    }

    fn with_headers<B>(
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        for (key, value) in headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder
    }

    impl Transport for UreqTransport {
        fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
            let agent = &self.agent;
            let headers = req.headers.as_slice();

            let result = match (req.method, req.body.as_deref()) {
                (HttpMethod::Get, _) => with_headers(agent.get(&req.url), headers).call(),
                (HttpMethod::Delete, _) => with_headers(agent.delete(&req.url), headers).call(),
                (HttpMethod::Post, Some(body)) => {
                    with_headers(agent.post(&req.url), headers).send(body.as_bytes())
                }
                (HttpMethod::Post, None) => with_headers(agent.post(&req.url), headers).send_empty(),
                (HttpMethod::Put, Some(body)) => {
                    with_headers(agent.put(&req.url), headers).send(body.as_bytes())
                }
                (HttpMethod::Put, None) => with_headers(agent.put(&req.url), headers).send_empty(),
            };
            let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect();
            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            Ok(HttpResponse { status, headers, body })
        }
    }
}
