//! Request descriptors and the request builder.
//!
//! A [`RequestConfig`] describes one HTTP call with named optional fields.
//! Applications keep a default descriptor in the interceptor configuration and
//! supply a per-call descriptor with every authenticated request; the two are
//! combined by [`RequestConfig::merge`] and then stamped with the current
//! credential by [`build_request`].

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `content-type: application/json`
    Json(serde_json::Value),
    /// Sent as-is as UTF-8 text
    Text(String),
    /// Sent as raw bytes
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Encoded size of the body in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        let len = match self {
            Self::Json(value) => value.to_string().len(),
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        };
        len as u64
    }
}

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Parse as JSON, falling back to text when the body is not valid JSON
    #[default]
    Json,
    /// Decode as UTF-8 text
    Text,
    /// Keep the raw bytes
    Bytes,
}

/// HTTP basic authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// User name
    pub username: String,
    /// Optional password
    pub password: Option<String>,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Custom query string serializer.
///
/// Receives the request params and returns the query string without the
/// leading `?`.
#[derive(Clone)]
pub struct ParamsSerializer(Arc<dyn Fn(&[(String, String)]) -> String + Send + Sync>);

impl ParamsSerializer {
    /// Wrap a serializer function.
    pub fn new<F>(serializer: F) -> Self
    where
        F: Fn(&[(String, String)]) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(serializer))
    }

    /// Serialize params into a query string.
    #[must_use]
    pub fn serialize(&self, params: &[(String, String)]) -> String {
        (self.0)(params)
    }
}

impl std::fmt::Debug for ParamsSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ParamsSerializer(<fn>)")
    }
}

/// Immutable description of one HTTP call.
///
/// Every field is optional so that a per-call descriptor can override only
/// what it needs; see [`RequestConfig::merge`].
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Target URL, absolute or relative to `base_url`
    pub url: Option<String>,
    /// HTTP method (GET when unset)
    pub method: Option<Method>,
    /// Prefix for relative URLs
    pub base_url: Option<String>,
    /// Request headers
    pub headers: HeaderMap,
    /// Query parameters
    pub params: Option<Vec<(String, String)>>,
    /// Custom query string serializer for `params`
    pub params_serializer: Option<ParamsSerializer>,
    /// Request body
    pub data: Option<RequestBody>,
    /// Whole-request timeout
    pub timeout: Option<Duration>,
    /// Message of the error produced when `timeout` elapses
    pub timeout_error_message: Option<String>,
    /// Cross-site credentials flag for browser transports
    pub with_credentials: Option<bool>,
    /// HTTP basic authentication
    pub basic_auth: Option<BasicAuth>,
    /// Response decoding hint
    pub response_type: Option<ResponseType>,
    /// Maximum number of redirects to follow
    pub max_redirects: Option<usize>,
    /// Maximum accepted response body size in bytes
    pub max_content_length: Option<u64>,
}

impl RequestConfig {
    /// Create an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `GET url`.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new().with_method(Method::GET).with_url(url)
    }

    /// Descriptor for `POST url` with a JSON body.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new()
            .with_method(Method::POST)
            .with_url(url)
            .with_data(RequestBody::Json(body))
    }

    /// Set the target URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set a header, replacing previous values for the same name.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the query parameters.
    #[must_use]
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params = Some(params.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Set a custom query string serializer.
    #[must_use]
    pub fn with_params_serializer(mut self, serializer: ParamsSerializer) -> Self {
        self.params_serializer = Some(serializer);
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn with_data(mut self, data: RequestBody) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the whole-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the timeout error message.
    #[must_use]
    pub fn with_timeout_error_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_error_message = Some(message.into());
        self
    }

    /// Set the cross-site credentials flag.
    #[must_use]
    pub const fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    /// Set HTTP basic authentication.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }

    /// Set the response decoding hint.
    #[must_use]
    pub const fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Set the redirect limit.
    #[must_use]
    pub const fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    /// Set the response size limit.
    #[must_use]
    pub const fn with_max_content_length(mut self, max_content_length: u64) -> Self {
        self.max_content_length = Some(max_content_length);
        self
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Every field set in `overrides` replaces the one in `self`. Headers are
    /// merged per name: a name present in `overrides` replaces all values of
    /// that name, other names are kept.
    #[must_use]
    pub fn merge(&self, overrides: &Self) -> Self {
        let mut headers = self.headers.clone();
        for name in overrides.headers.keys() {
            headers.remove(name);
            for value in overrides.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        Self {
            url: overrides.url.clone().or_else(|| self.url.clone()),
            method: overrides.method.clone().or_else(|| self.method.clone()),
            base_url: overrides.base_url.clone().or_else(|| self.base_url.clone()),
            headers,
            params: overrides.params.clone().or_else(|| self.params.clone()),
            params_serializer: overrides
                .params_serializer
                .clone()
                .or_else(|| self.params_serializer.clone()),
            data: overrides.data.clone().or_else(|| self.data.clone()),
            timeout: overrides.timeout.or(self.timeout),
            timeout_error_message: overrides
                .timeout_error_message
                .clone()
                .or_else(|| self.timeout_error_message.clone()),
            with_credentials: overrides.with_credentials.or(self.with_credentials),
            basic_auth: overrides.basic_auth.clone().or_else(|| self.basic_auth.clone()),
            response_type: overrides.response_type.or(self.response_type),
            max_redirects: overrides.max_redirects.or(self.max_redirects),
            max_content_length: overrides.max_content_length.or(self.max_content_length),
        }
    }

    /// Value of the `Authorization` header, if any.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}

/// Compose the transport config for one authenticated request.
///
/// Merges `overrides` onto `defaults` and, when a non-empty credential is
/// present, sets `Authorization: bearer <token>`. The credential replaces any
/// caller-supplied `Authorization` header; all other headers are untouched.
#[must_use]
pub fn build_request(
    defaults: &RequestConfig,
    overrides: &RequestConfig,
    credential: Option<&str>,
) -> RequestConfig {
    let mut config = defaults.merge(overrides);

    if let Some(token) = credential.filter(|token| !token.is_empty()) {
        match HeaderValue::from_str(&format!("bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                config.headers.insert(AUTHORIZATION, value);
            },
            Err(_) => {
                tracing::warn!("Stored credential is not a valid header value; sending request without it");
            },
        }
    }

    config
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reqwest::header::{ACCEPT, CONTENT_TYPE};

    fn defaults() -> RequestConfig {
        RequestConfig::new()
            .with_base_url("https://api.example.com")
            .with_header(ACCEPT, HeaderValue::from_static("application/json"))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_timeout(Duration::from_secs(30))
    }

    #[test]
    fn test_merge_override_wins_per_field() {
        let overrides = RequestConfig::get("/api/v1/me").with_timeout(Duration::from_secs(5));

        let merged = defaults().merge(&overrides);

        assert_eq!(merged.url.as_deref(), Some("/api/v1/me"));
        assert_eq!(merged.method, Some(Method::GET));
        assert_eq!(merged.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
        assert_eq!(merged.response_type, None);
    }

    #[test]
    fn test_merge_headers_per_key() {
        let overrides = RequestConfig::new()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let merged = defaults().merge(&overrides);

        assert_eq!(merged.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(merged.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(merged.headers.get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_build_without_credential_adds_no_authorization() {
        let config = build_request(&defaults(), &RequestConfig::get("/x"), None);
        assert!(config.authorization().is_none());
        assert_eq!(config.headers.len(), 2);
    }

    #[test]
    fn test_build_with_credential_adds_bearer_header() {
        let config = build_request(&defaults(), &RequestConfig::get("/x"), Some("abc"));
        assert_eq!(config.authorization(), Some("bearer abc"));
        assert_eq!(config.headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_build_credential_replaces_caller_authorization() {
        let overrides = RequestConfig::get("/x")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));

        let config = build_request(&defaults(), &overrides, Some("abc"));

        assert_eq!(config.headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(config.authorization(), Some("bearer abc"));
    }

    #[test]
    fn test_build_skips_empty_and_invalid_credentials() {
        let empty = build_request(&defaults(), &RequestConfig::new(), Some(""));
        assert!(empty.authorization().is_none());

        let invalid = build_request(&defaults(), &RequestConfig::new(), Some("bad\ntoken"));
        assert!(invalid.authorization().is_none());
    }

    #[test]
    fn test_basic_auth_debug_redacts_password() {
        let config = RequestConfig::new().with_basic_auth("alice", Some("s3cret".into()));
        let debug = format!("{:?}", config.basic_auth.unwrap());
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    proptest! {
        #[test]
        fn prop_build_preserves_other_headers(
            names in proptest::collection::btree_set("x-[a-z]{1,12}", 0..6),
            token in proptest::option::of("[A-Za-z0-9._-]{1,40}"),
        ) {
            let mut overrides = RequestConfig::get("/resource");
            for name in &names {
                overrides = overrides.with_header(
                    HeaderName::from_bytes(name.as_bytes()).unwrap(),
                    HeaderValue::from_static("1"),
                );
            }

            let config = build_request(&defaults(), &overrides, token.as_deref());

            for name in &names {
                prop_assert_eq!(config.headers.get(name.as_str()).unwrap(), "1");
            }
            prop_assert!(config.headers.get(ACCEPT).is_some());

            match &token {
                Some(token) => {
                    let expected = format!("bearer {token}");
                    prop_assert_eq!(config.authorization(), Some(expected.as_str()));
                    prop_assert_eq!(config.headers.len(), names.len() + 3);
                }
                None => {
                    prop_assert!(config.authorization().is_none());
                    prop_assert_eq!(config.headers.len(), names.len() + 2);
                }
            }
        }
    }
}
