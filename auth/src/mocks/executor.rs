//! Mock request executor for testing.

use crate::request::RequestConfig;
use crate::transport::{
    HttpResponse, ProgressEvent, ProgressHandlers, RequestError, RequestErrorKind, RequestExecutor,
};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Hook run synchronously when a request reaches the executor.
type ExecuteHook = Arc<dyn Fn(&RequestConfig) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum ProgressStep {
    Upload(ProgressEvent),
    Download(ProgressEvent),
}

/// One scripted outcome of [`MockExecutor`].
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    progress: Vec<ProgressStep>,
    delay: Option<Duration>,
    result: Result<HttpResponse, RequestError>,
}

impl ScriptedReply {
    /// Resolve with `response`.
    ///
    /// Non-2xx responses are turned into a [`RequestError`] carrying them,
    /// as a real executor would.
    #[must_use]
    pub fn respond(response: HttpResponse) -> Self {
        let result = if response.status.is_success() {
            Ok(response)
        } else {
            Err(RequestError::status(response))
        };

        Self {
            progress: Vec::new(),
            delay: None,
            result,
        }
    }

    /// Fail with `error`.
    #[must_use]
    pub fn fail(error: RequestError) -> Self {
        Self {
            progress: Vec::new(),
            delay: None,
            result: Err(error),
        }
    }

    /// Report an upload progress event before resolving.
    #[must_use]
    pub fn with_upload(mut self, loaded: u64, total: Option<u64>) -> Self {
        self.progress.push(ProgressStep::Upload(ProgressEvent { loaded, total }));
        self
    }

    /// Report a download progress event before resolving.
    #[must_use]
    pub fn with_download(mut self, loaded: u64, total: Option<u64>) -> Self {
        self.progress.push(ProgressStep::Download(ProgressEvent { loaded, total }));
        self
    }

    /// Wait before resolving.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Mock request executor.
///
/// Replays scripted replies in order and records every request it receives.
/// A request with nothing scripted fails as a transport error.
#[derive(Clone, Default)]
pub struct MockExecutor {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<RequestConfig>>>,
    hook: Arc<Mutex<Option<ExecuteHook>>>,
}

impl MockExecutor {
    /// Create an executor with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push(&self, reply: ScriptedReply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Queue a plain response.
    pub fn respond(&self, response: HttpResponse) -> &Self {
        self.push(ScriptedReply::respond(response))
    }

    /// Queue a failure.
    pub fn fail(&self, error: RequestError) -> &Self {
        self.push(ScriptedReply::fail(error))
    }

    /// Run `hook` whenever a request reaches the executor.
    pub fn on_execute<F>(&self, hook: F)
    where
        F: Fn(&RequestConfig) + Send + Sync + 'static,
    {
        *self.hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Requests received so far (for testing).
    #[must_use]
    pub fn requests(&self) -> Vec<RequestConfig> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor for MockExecutor {
    fn execute(
        &self,
        config: RequestConfig,
        progress: ProgressHandlers,
    ) -> impl Future<Output = Result<HttpResponse, RequestError>> + Send {
        let hook = self.hook.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(hook) = hook {
            hook(&config);
        }

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config);
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        async move {
            let Some(reply) = reply else {
                return Err(RequestError::new(
                    RequestErrorKind::Transport,
                    "no scripted reply",
                ));
            };

            for step in reply.progress {
                match step {
                    ProgressStep::Upload(event) => progress.report_upload(event),
                    ProgressStep::Download(event) => progress.report_download(event),
                }
                tokio::task::yield_now().await;
            }

            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }

            reply.result
        }
    }
}
