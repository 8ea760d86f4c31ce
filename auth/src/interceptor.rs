//! The authenticated interceptor.
//!
//! A [`Middleware`] stage that owns the two [`AuthenticatedAction`]s:
//!
//! - `LogOut` clears the credential and navigates to the authenticate URL,
//!   synchronously, before the action reaches the reducer.
//! - `Request` dispatches the `on_start` action ahead of the request action,
//!   so it is reduced first, then becomes one ordered [`Effect::Stream`]:
//!   progress actions as they arrive, then the outcome action.
//!
//! Every other action is ignored. The original action always continues to
//! the reducer; the interceptor only adds effects.
//!
//! # Outcome handling
//!
//! | Result | Credential | Dispatched |
//! |---|---|---|
//! | success | refreshed from headers | `on_response` |
//! | error with the unauthorized status | refreshed, then cleared; navigation | nothing |
//! | other error with a response | refreshed from headers | `on_error` |
//! | error without a response | untouched | `on_error` |

use crate::actions::{AuthenticatedAction, AuthenticatedActionKind, AuthenticatedRequest};
use crate::config::InterceptorConfig;
use crate::credential::CredentialStore;
use crate::error::ConfigError;
use crate::providers::{CredentialStorage, Navigator};
use crate::request::{RequestConfig, build_request};
use crate::transport::{ProgressEvent, ProgressHandlers, RequestExecutor};
use reqwest::StatusCode;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokenflow_core::effect::Effect;
use tokenflow_core::middleware::{Handled, Middleware};
use tokio::sync::mpsc;

/// Middleware attaching the session credential to requests and ending the
/// session when the server rejects it.
pub struct AuthenticatedInterceptor<A, X> {
    executor: Arc<X>,
    session: Arc<Session>,
    _action: PhantomData<fn() -> A>,
}

/// State shared between the interceptor and its in-flight request streams.
struct Session {
    credentials: CredentialStore,
    navigator: Arc<dyn Navigator>,
    authenticate_url: String,
    defaults: RequestConfig,
    unauthorized_status: StatusCode,
}

impl Session {
    fn end(&self) {
        self.credentials.clear();

        if self.authenticate_url.is_empty() {
            tracing::info!("Session ended");
        } else {
            tracing::info!(url = %self.authenticate_url, "Session ended; navigating");
            self.navigator.navigate(&self.authenticate_url);
        }
        metrics::counter!("auth.session.ended").increment(1);
    }
}

enum Progress {
    Upload(ProgressEvent),
    Download(ProgressEvent),
}

enum Step<T> {
    Progress(Progress),
    Done(T),
}

impl<A, X: RequestExecutor> AuthenticatedInterceptor<A, X> {
    /// Create an interceptor with default settings: no navigation target,
    /// empty request defaults, 401 ends the session.
    pub fn new(executor: X, credentials: CredentialStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            executor: Arc::new(executor),
            session: Arc::new(Session {
                credentials,
                navigator,
                authenticate_url: String::new(),
                defaults: RequestConfig::default(),
                unauthorized_status: StatusCode::UNAUTHORIZED,
            }),
            _action: PhantomData,
        }
    }

    /// Create an interceptor from `config`, loading the credential from `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(
        config: InterceptorConfig,
        executor: X,
        storage: Arc<dyn CredentialStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let header_key = config.header_name()?;
        let credentials = CredentialStore::load(storage, config.token_key, header_key);

        Ok(Self {
            executor: Arc::new(executor),
            session: Arc::new(Session {
                credentials,
                navigator,
                authenticate_url: config.authenticate_url,
                defaults: config.defaults,
                unauthorized_status: config.unauthorized_status,
            }),
            _action: PhantomData,
        })
    }

    /// Handle to the session credential.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.session.credentials
    }

    /// Clear the credential and navigate to the authenticate URL, if any.
    pub fn end_session(&self) {
        self.session.end();
    }
}

impl<A, X> AuthenticatedInterceptor<A, X>
where
    A: Send + 'static,
    X: RequestExecutor,
{
    fn request_effect(&self, request: AuthenticatedRequest<A>) -> Effect<A> {
        let executor = Arc::clone(&self.executor);
        let session = Arc::clone(&self.session);

        let credential = session.credentials.get();
        let config = build_request(&session.defaults, request.config(), credential.as_deref());
        tracing::debug!(
            url = config.url.as_deref().unwrap_or_default(),
            authenticated = credential.is_some(),
            "Authenticated request built"
        );

        Effect::Stream(Box::pin(async_stream::stream! {
            metrics::counter!("auth.requests.started").increment(1);
            let started = Instant::now();

            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
            let handlers = progress_handlers(&request, &progress_tx);
            drop(progress_tx);

            let mut exchange = std::pin::pin!(executor.execute(config, handlers));
            let result = loop {
                let step = tokio::select! {
                    biased;
                    Some(progress) = progress_rx.recv() => Step::Progress(progress),
                    result = &mut exchange => Step::Done(result),
                };

                match step {
                    Step::Progress(progress) => {
                        if let Some(action) = progress_action(&request, progress) {
                            yield action;
                        }
                    },
                    Step::Done(result) => break result,
                }
            };

            while let Ok(progress) = progress_rx.try_recv() {
                if let Some(action) = progress_action(&request, progress) {
                    yield action;
                }
            }

            metrics::histogram!("auth.requests.duration_seconds").record(started.elapsed().as_secs_f64());

            match result {
                Ok(response) => {
                    tracing::debug!(status = response.status.as_u16(), "Authenticated request succeeded");
                    metrics::counter!("auth.requests.completed", "outcome" => "success").increment(1);
                    session.credentials.refresh_from_headers(&response.headers);

                    if let Some(action) = request.response_action(response) {
                        yield action;
                    }
                },
                Err(error) => {
                    if let Some(response) = &error.response {
                        session.credentials.refresh_from_headers(&response.headers);
                    }

                    if error.status_code() == Some(session.unauthorized_status) {
                        tracing::debug!("Credential rejected by server");
                        metrics::counter!("auth.requests.completed", "outcome" => "unauthorized").increment(1);
                        session.end();
                    } else {
                        tracing::debug!(kind = ?error.kind, error = %error, "Authenticated request failed");
                        metrics::counter!("auth.requests.completed", "outcome" => "error").increment(1);

                        if let Some(action) = request.error_action(error) {
                            yield action;
                        }
                    }
                },
            }
        }))
    }
}

fn progress_handlers<A>(
    request: &AuthenticatedRequest<A>,
    sink: &mpsc::UnboundedSender<Progress>,
) -> ProgressHandlers {
    let mut handlers = ProgressHandlers::default();

    if request.wants_upload_progress() {
        let sink = sink.clone();
        handlers.upload = Some(Arc::new(move |event: ProgressEvent| {
            let _ = sink.send(Progress::Upload(event));
        }));
    }
    if request.wants_download_progress() {
        let sink = sink.clone();
        handlers.download = Some(Arc::new(move |event: ProgressEvent| {
            let _ = sink.send(Progress::Download(event));
        }));
    }

    handlers
}

fn progress_action<A>(request: &AuthenticatedRequest<A>, progress: Progress) -> Option<A> {
    match progress {
        Progress::Upload(event) => request.upload_progress_action(event),
        Progress::Download(event) => request.download_progress_action(event),
    }
}

impl<A, X> Middleware for AuthenticatedInterceptor<A, X>
where
    A: AuthenticatedActionKind + Send + 'static,
    X: RequestExecutor,
{
    type Action = A;

    fn handle(&self, action: &A) -> Handled<A> {
        match action.as_authenticated() {
            Some(AuthenticatedAction::LogOut) => {
                self.end_session();
                Handled::none()
            },
            Some(AuthenticatedAction::Request(request)) => {
                // on_start runs before the credential is read for the request
                let handled = match request.start_action() {
                    Some(started) => Handled::none().dispatch(started),
                    None => Handled::none(),
                };
                handled.with_effect(self.request_effect(request.clone()))
            },
            None => Handled::none(),
        }
    }
}

impl<A, X> std::fmt::Debug for AuthenticatedInterceptor<A, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedInterceptor")
            .field("credentials", &self.session.credentials)
            .field("authenticate_url", &self.session.authenticate_url)
            .field("unauthorized_status", &self.session.unauthorized_status)
            .finish_non_exhaustive()
    }
}
