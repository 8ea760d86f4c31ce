//! Transport vocabulary shared by the interceptor and request executors.
//!
//! The interceptor never talks to the network itself. It hands a fully built
//! [`RequestConfig`] to a [`RequestExecutor`] and reacts to the
//! [`HttpResponse`] or [`RequestError`] that comes back.

use crate::request::RequestConfig;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body (or a zero-length one)
    Empty,
    /// Parsed JSON document
    Json(serde_json::Value),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// Borrow the JSON document, if the body is one.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Deserialize the body as JSON into `T`.
    ///
    /// Text and byte bodies are parsed; an empty body reads as `null`.
    ///
    /// # Errors
    ///
    /// Returns the parser error if the body does not match `T`.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Empty => serde_json::from_value(serde_json::Value::Null),
            Self::Json(value) => serde_json::from_value(value.clone()),
            Self::Text(text) => serde_json::from_str(text),
            Self::Bytes(bytes) => serde_json::from_slice(bytes),
        }
    }
}

/// A response received from the server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded body
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Response with the given status, no headers and no body.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Replace the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// The server answered with a non-2xx status
    Status,
    /// The timeout elapsed before the request completed
    Timeout,
    /// The connection could not be established
    Connect,
    /// The redirect limit was exceeded
    Redirect,
    /// Reading the body failed or it exceeded the size limit
    Body,
    /// The body could not be decoded
    Decode,
    /// The descriptor could not be turned into a request
    InvalidRequest,
    /// Any other transport failure
    Transport,
}

/// A failed request.
///
/// Carries the response when the server answered (e.g. non-2xx statuses), and
/// none for transport-level failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestError {
    /// Failure class
    pub kind: RequestErrorKind,
    /// Human readable message
    pub message: String,
    /// Server response, when one was received
    pub response: Option<HttpResponse>,
}

impl RequestError {
    /// Error without a response.
    #[must_use]
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
        }
    }

    /// Error for a non-2xx response.
    #[must_use]
    pub fn status(response: HttpResponse) -> Self {
        Self {
            kind: RequestErrorKind::Status,
            message: format!("Request failed with status code {}", response.status.as_u16()),
            response: Some(response),
        }
    }

    /// Status of the attached response, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|response| response.status)
    }

    /// Attach the response the failure happened on.
    #[must_use]
    pub fn with_response(mut self, response: HttpResponse) -> Self {
        self.response = Some(response);
        self
    }
}

/// Progress of an upload or download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes transferred so far
    pub loaded: u64,
    /// Total bytes, when known
    pub total: Option<u64>,
}

/// Sink for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress sinks handed to an executor for one request.
#[derive(Clone, Default)]
pub struct ProgressHandlers {
    /// Called as the request body is sent
    pub upload: Option<ProgressCallback>,
    /// Called as the response body is received
    pub download: Option<ProgressCallback>,
}

impl ProgressHandlers {
    /// Report upload progress, if anyone listens.
    pub fn report_upload(&self, event: ProgressEvent) {
        if let Some(upload) = &self.upload {
            upload(event);
        }
    }

    /// Report download progress, if anyone listens.
    pub fn report_download(&self, event: ProgressEvent) {
        if let Some(download) = &self.download {
            download(event);
        }
    }
}

impl std::fmt::Debug for ProgressHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHandlers")
            .field("upload", &self.upload.is_some())
            .field("download", &self.download.is_some())
            .finish()
    }
}

/// Issues one HTTP request.
///
/// Implementations report progress through `progress` in the order it
/// happens, and resolve with the response for 2xx statuses or a
/// [`RequestError`] otherwise.
///
/// # Example
///
/// ```ignore
/// let executor = ReqwestExecutor::new();
/// let response = executor
///     .execute(RequestConfig::get("https://api.example.com/me"), ProgressHandlers::default())
///     .await?;
/// ```
pub trait RequestExecutor: Send + Sync + 'static {
    /// Execute the request described by `config`.
    fn execute(
        &self,
        config: RequestConfig,
        progress: ProgressHandlers,
    ) -> impl Future<Output = Result<HttpResponse, RequestError>> + Send;
}
