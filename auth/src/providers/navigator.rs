//! Navigation trait.

/// Moves the client to another location when the session ends.
///
/// Navigation is terminal for the current session: the interceptor performs
/// no further work for requests that complete afterwards beyond what they
/// already started.
pub trait Navigator: Send + Sync {
    /// Navigate to `url`.
    fn navigate(&self, url: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, url: &str) {
        self(url);
    }
}

/// Navigator that stays put.
///
/// For processes without a navigation target (CLIs, services).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNavigation;

impl Navigator for NoNavigation {
    fn navigate(&self, url: &str) {
        tracing::debug!(url, "Navigation requested but not supported here");
    }
}
