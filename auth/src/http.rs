//! `reqwest`-backed request executor.

use crate::request::{RequestBody, RequestConfig, ResponseType};
use crate::transport::{
    HttpResponse, ProgressEvent, ProgressHandlers, RequestError, RequestErrorKind, RequestExecutor,
    ResponseBody,
};
use futures::StreamExt;
use reqwest::{Method, Url, redirect};
use std::time::Duration;

/// Executes request descriptors with a shared [`reqwest::Client`].
///
/// Transport behaviour:
/// - `url` is used as-is when absolute, otherwise appended to `base_url`
/// - `params` are appended to the query string, through `params_serializer`
///   when one is set
/// - `timeout` bounds the whole exchange including the body; the error
///   message is `timeout_error_message` or `timeout of {ms}ms exceeded`
/// - `max_redirects` builds a dedicated client with that redirect limit
/// - download progress is reported per received chunk, upload progress once
///   the body has been sent
/// - non-2xx responses become a [`RequestError`] carrying the response
/// - a body that is too large, fails mid-stream or can't be decoded becomes a
///   [`RequestError`] carrying the status and headers with an empty body
///
/// `with_credentials` only has meaning for browser transports and is ignored.
#[derive(Debug, Clone, Default)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    /// Executor with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor around an existing client (connection pool, proxies, TLS).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn client_for(&self, config: &RequestConfig) -> Result<reqwest::Client, RequestError> {
        let Some(limit) = config.max_redirects else {
            return Ok(self.client.clone());
        };

        let policy = if limit == 0 {
            redirect::Policy::none()
        } else {
            redirect::Policy::limited(limit)
        };

        reqwest::Client::builder()
            .redirect(policy)
            .build()
            .map_err(|e| RequestError::new(RequestErrorKind::InvalidRequest, e.to_string()))
    }
}

impl RequestExecutor for ReqwestExecutor {
    async fn execute(
        &self,
        config: RequestConfig,
        progress: ProgressHandlers,
    ) -> Result<HttpResponse, RequestError> {
        let url = resolve_url(&config)?;
        let method = config.method.clone().unwrap_or(Method::GET);
        tracing::debug!(%method, %url, "Sending request");

        if config.with_credentials.is_some() {
            tracing::trace!("with_credentials has no effect outside browser transports");
        }

        let client = self.client_for(&config)?;
        let mut builder = client.request(method, url).headers(config.headers.clone());

        if let Some(auth) = &config.basic_auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_ref());
        }

        let upload_len = config.data.as_ref().map(RequestBody::encoded_len);
        builder = match config.data.clone() {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes),
            None => builder,
        };

        let response_type = config.response_type.unwrap_or_default();
        let exchange = async {
            let response = builder.send().await.map_err(transport_error)?;

            if let Some(len) = upload_len {
                progress.report_upload(ProgressEvent {
                    loaded: len,
                    total: Some(len),
                });
            }

            read_response(response, response_type, config.max_content_length, &progress).await
        };

        let response = match config.timeout {
            Some(limit) if !limit.is_zero() => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| timeout_error(&config, limit))??,
            _ => exchange.await?,
        };

        tracing::debug!(status = response.status.as_u16(), "Request completed");

        if response.status.is_success() {
            Ok(response)
        } else {
            Err(RequestError::status(response))
        }
    }
}

/// Resolve the final URL, including query parameters.
fn resolve_url(config: &RequestConfig) -> Result<Url, RequestError> {
    let url = config.url.as_deref().unwrap_or_default();
    let full = match config.base_url.as_deref() {
        Some(base) if !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_string(),
    };

    let mut parsed = Url::parse(&full).map_err(|e| {
        RequestError::new(RequestErrorKind::InvalidRequest, format!("Invalid URL {full:?}: {e}"))
    })?;

    if let Some(params) = &config.params {
        match &config.params_serializer {
            Some(serializer) => {
                let query = serializer.serialize(params);
                if !query.is_empty() {
                    let query = match parsed.query() {
                        Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
                        _ => query,
                    };
                    parsed.set_query(Some(&query));
                }
            },
            None if !params.is_empty() => {
                parsed.query_pairs_mut().extend_pairs(params);
            },
            None => {},
        }
    }

    Ok(parsed)
}

/// `scheme://...` or protocol-relative `//...`
fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }

    url.split_once("://").is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'))
}

async fn read_response(
    response: reqwest::Response,
    response_type: ResponseType,
    max_content_length: Option<u64>,
    progress: &ProgressHandlers,
) -> Result<HttpResponse, RequestError> {
    let head = HttpResponse::new(response.status()).with_headers(response.headers().clone());
    let total = response.content_length();

    // Past this point the server has answered: failures keep status and headers.
    if let (Some(max), Some(total)) = (max_content_length, total) {
        if total > max {
            return Err(content_too_large(max).with_response(head));
        }
    }

    let mut chunks = response.bytes_stream();
    let mut buffer = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => return Err(transport_error(error).with_response(head)),
        };
        buffer.extend_from_slice(&chunk);

        let loaded = buffer.len() as u64;
        if let Some(max) = max_content_length.filter(|max| loaded > *max) {
            return Err(content_too_large(max).with_response(head));
        }
        progress.report_download(ProgressEvent { loaded, total });
    }

    match decode_body(buffer, response_type) {
        Ok(body) => Ok(head.with_body(body)),
        Err(error) => Err(error.with_response(head)),
    }
}

fn decode_body(bytes: Vec<u8>, response_type: ResponseType) -> Result<ResponseBody, RequestError> {
    if bytes.is_empty() {
        return Ok(ResponseBody::Empty);
    }

    match response_type {
        ResponseType::Bytes => Ok(ResponseBody::Bytes(bytes)),
        ResponseType::Text => String::from_utf8(bytes).map(ResponseBody::Text).map_err(|e| {
            RequestError::new(
                RequestErrorKind::Decode,
                format!("Response body is not valid UTF-8: {e}"),
            )
        }),
        ResponseType::Json => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(ResponseBody::Json(value)),
            Err(_) => Ok(String::from_utf8(bytes)
                .map_or_else(|e| ResponseBody::Bytes(e.into_bytes()), ResponseBody::Text)),
        },
    }
}

fn transport_error(error: reqwest::Error) -> RequestError {
    let kind = if error.is_timeout() {
        RequestErrorKind::Timeout
    } else if error.is_connect() {
        RequestErrorKind::Connect
    } else if error.is_redirect() {
        RequestErrorKind::Redirect
    } else if error.is_body() {
        RequestErrorKind::Body
    } else if error.is_decode() {
        RequestErrorKind::Decode
    } else if error.is_builder() {
        RequestErrorKind::InvalidRequest
    } else {
        RequestErrorKind::Transport
    };

    RequestError::new(kind, error.to_string())
}

fn timeout_error(config: &RequestConfig, limit: Duration) -> RequestError {
    let message = config
        .timeout_error_message
        .clone()
        .unwrap_or_else(|| format!("timeout of {}ms exceeded", limit.as_millis()));
    RequestError::new(RequestErrorKind::Timeout, message)
}

fn content_too_large(max: u64) -> RequestError {
    RequestError::new(
        RequestErrorKind::Body,
        format!("maxContentLength size of {max} exceeded"),
    )
}
