//! Actions owned by the authenticated interceptor.
//!
//! Applications embed [`AuthenticatedAction`] in their own action type and
//! implement [`AuthenticatedActionKind`] so the interceptor can recognise it.
//! Everything else flowing through the pipeline is ignored.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Clone, Debug)]
//! enum AppAction {
//!     Auth(AuthenticatedAction<AppAction>),
//!     ProfileLoaded(User),
//!     ProfileFailed(String),
//! }
//!
//! impl AuthenticatedActionKind for AppAction {
//!     fn as_authenticated(&self) -> Option<&AuthenticatedAction<Self>> {
//!         match self {
//!             Self::Auth(action) => Some(action),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let fetch = AuthenticatedRequest::new(
//!     RequestConfig::get("/api/v1/me"),
//!     |response| parse_user(&response.body).map(AppAction::ProfileLoaded),
//!     |error| Some(AppAction::ProfileFailed(error.message)),
//! );
//! store.send(AppAction::Auth(authenticated_request(fetch))).await?;
//! ```

use crate::request::RequestConfig;
use crate::transport::{HttpResponse, ProgressEvent, RequestError, ResponseBody};
use std::sync::Arc;

/// Callback turning a value into an optional action.
pub type ActionMapper<A, T> = Arc<dyn Fn(T) -> Option<A> + Send + Sync>;

/// Callback producing an optional action from nothing.
pub type ActionFactory<A> = Arc<dyn Fn() -> Option<A> + Send + Sync>;

/// Callback transforming a response body before `on_response` sees it.
pub type BodyConverter = Arc<dyn Fn(ResponseBody) -> ResponseBody + Send + Sync>;

/// Payload of an authenticated request.
///
/// Built with [`AuthenticatedRequest::new`], which requires both the
/// response and the error mapping; the optional callbacks are added with the
/// builder methods. Every callback may return `None` to dispatch nothing.
pub struct AuthenticatedRequest<A> {
    config: RequestConfig,
    on_start: Option<ActionFactory<A>>,
    on_upload_progress: Option<ActionMapper<A, ProgressEvent>>,
    on_download_progress: Option<ActionMapper<A, ProgressEvent>>,
    convert_data: Option<BodyConverter>,
    on_response: ActionMapper<A, HttpResponse>,
    on_error: ActionMapper<A, RequestError>,
}

impl<A> AuthenticatedRequest<A> {
    /// Create a request payload.
    pub fn new<R, E>(config: RequestConfig, on_response: R, on_error: E) -> Self
    where
        R: Fn(HttpResponse) -> Option<A> + Send + Sync + 'static,
        E: Fn(RequestError) -> Option<A> + Send + Sync + 'static,
    {
        Self {
            config,
            on_start: None,
            on_upload_progress: None,
            on_download_progress: None,
            convert_data: None,
            on_response: Arc::new(on_response),
            on_error: Arc::new(on_error),
        }
    }

    /// Action dispatched before the request is sent.
    #[must_use]
    pub fn on_start<F>(mut self, on_start: F) -> Self
    where
        F: Fn() -> Option<A> + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(on_start));
        self
    }

    /// Action dispatched for every upload progress event.
    #[must_use]
    pub fn on_upload_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(ProgressEvent) -> Option<A> + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(on_progress));
        self
    }

    /// Action dispatched for every download progress event.
    #[must_use]
    pub fn on_download_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(ProgressEvent) -> Option<A> + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(on_progress));
        self
    }

    /// Transform successful response bodies before `on_response`.
    #[must_use]
    pub fn convert_data<F>(mut self, convert: F) -> Self
    where
        F: Fn(ResponseBody) -> ResponseBody + Send + Sync + 'static,
    {
        self.convert_data = Some(Arc::new(convert));
        self
    }

    /// Per-call request descriptor.
    #[must_use]
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Whether upload progress is wanted.
    #[must_use]
    pub const fn wants_upload_progress(&self) -> bool {
        self.on_upload_progress.is_some()
    }

    /// Whether download progress is wanted.
    #[must_use]
    pub const fn wants_download_progress(&self) -> bool {
        self.on_download_progress.is_some()
    }

    /// Run `on_start`, if set.
    pub fn start_action(&self) -> Option<A> {
        self.on_start.as_ref().and_then(|on_start| on_start())
    }

    /// Run `on_upload_progress`, if set.
    pub fn upload_progress_action(&self, event: ProgressEvent) -> Option<A> {
        self.on_upload_progress.as_ref().and_then(|on_progress| on_progress(event))
    }

    /// Run `on_download_progress`, if set.
    pub fn download_progress_action(&self, event: ProgressEvent) -> Option<A> {
        self.on_download_progress.as_ref().and_then(|on_progress| on_progress(event))
    }

    /// Run `convert_data` on the body, then `on_response`.
    pub fn response_action(&self, mut response: HttpResponse) -> Option<A> {
        if let Some(convert) = &self.convert_data {
            response.body = convert(response.body);
        }
        (self.on_response)(response)
    }

    /// Run `on_error`.
    pub fn error_action(&self, error: RequestError) -> Option<A> {
        (self.on_error)(error)
    }
}

impl<A> Clone for AuthenticatedRequest<A> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            on_start: self.on_start.clone(),
            on_upload_progress: self.on_upload_progress.clone(),
            on_download_progress: self.on_download_progress.clone(),
            convert_data: self.convert_data.clone(),
            on_response: Arc::clone(&self.on_response),
            on_error: Arc::clone(&self.on_error),
        }
    }
}

impl<A> std::fmt::Debug for AuthenticatedRequest<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedRequest")
            .field("config", &self.config)
            .field("on_start", &self.on_start.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("on_download_progress", &self.on_download_progress.is_some())
            .field("convert_data", &self.convert_data.is_some())
            .finish_non_exhaustive()
    }
}

/// Actions the interceptor acts on.
pub enum AuthenticatedAction<A> {
    /// Send an authenticated request (`authenticated-request`)
    Request(AuthenticatedRequest<A>),
    /// End the session (`authenticated-logout`)
    LogOut,
}

impl<A> AuthenticatedAction<A> {
    /// Pipeline tag of the action.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Request(_) => "authenticated-request",
            Self::LogOut => "authenticated-logout",
        }
    }
}

impl<A> Clone for AuthenticatedAction<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Request(request) => Self::Request(request.clone()),
            Self::LogOut => Self::LogOut,
        }
    }
}

impl<A> std::fmt::Debug for AuthenticatedAction<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(request) => f.debug_tuple("Request").field(request).finish(),
            Self::LogOut => f.write_str("LogOut"),
        }
    }
}

/// Create an `authenticated-request` action.
#[must_use]
pub const fn authenticated_request<A>(request: AuthenticatedRequest<A>) -> AuthenticatedAction<A> {
    AuthenticatedAction::Request(request)
}

/// Create an `authenticated-logout` action.
#[must_use]
pub const fn authenticated_log_out<A>() -> AuthenticatedAction<A> {
    AuthenticatedAction::LogOut
}

/// Application action types that can carry an [`AuthenticatedAction`].
pub trait AuthenticatedActionKind: Sized {
    /// The embedded authenticated action, if this is one.
    fn as_authenticated(&self) -> Option<&AuthenticatedAction<Self>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[derive(Debug, Clone, PartialEq)]
    enum Outcome {
        Started,
        Uploaded(u64),
        Done(ResponseBody),
        Failed(String),
    }

    fn request() -> AuthenticatedRequest<Outcome> {
        AuthenticatedRequest::new(
            RequestConfig::get("/x"),
            |response| Some(Outcome::Done(response.body)),
            |error| Some(Outcome::Failed(error.message)),
        )
    }

    #[test]
    fn test_optional_callbacks_default_to_nothing() {
        let request = request();
        assert_eq!(request.start_action(), None);
        assert_eq!(request.upload_progress_action(ProgressEvent { loaded: 1, total: None }), None);
        assert!(!request.wants_download_progress());
    }

    #[test]
    fn test_callbacks_produce_actions() {
        let request = request()
            .on_start(|| Some(Outcome::Started))
            .on_upload_progress(|event| Some(Outcome::Uploaded(event.loaded)));

        assert_eq!(request.start_action(), Some(Outcome::Started));
        assert_eq!(
            request.upload_progress_action(ProgressEvent { loaded: 7, total: Some(10) }),
            Some(Outcome::Uploaded(7))
        );
        assert_eq!(
            request.error_action(RequestError::status(HttpResponse::new(StatusCode::BAD_GATEWAY))),
            Some(Outcome::Failed("Request failed with status code 502".into()))
        );
    }

    #[test]
    fn test_convert_data_runs_before_on_response() {
        let request = request().convert_data(|body| match body {
            ResponseBody::Text(text) => ResponseBody::Text(text.to_uppercase()),
            other => other,
        });

        let response = HttpResponse::new(StatusCode::OK).with_body(ResponseBody::Text("ok".into()));
        assert_eq!(
            request.response_action(response),
            Some(Outcome::Done(ResponseBody::Text("OK".into())))
        );
    }

    #[test]
    fn test_tags() {
        let request: AuthenticatedAction<Outcome> = authenticated_request(request());
        assert_eq!(request.tag(), "authenticated-request");
        assert_eq!(authenticated_log_out::<Outcome>().tag(), "authenticated-logout");
        assert!(format!("{request:?}").starts_with("Request(AuthenticatedRequest"));
    }
}
