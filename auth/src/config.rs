//! Interceptor configuration.
//!
//! Values are provided by the application, either through the builders or
//! from `TOKENFLOW_*` environment variables.

use crate::error::ConfigError;
use crate::request::RequestConfig;
use reqwest::StatusCode;
use reqwest::header::HeaderName;
use std::env;

/// Default durable key of the credential.
pub const DEFAULT_TOKEN_KEY: &str = "__token";

/// Default response header carrying a rotated credential.
pub const DEFAULT_HEADER_KEY: &str = "x-refreshed-token";

/// Configuration of an [`AuthenticatedInterceptor`](crate::AuthenticatedInterceptor).
#[derive(Debug, Clone)]
pub struct InterceptorConfig {
    /// Durable key the credential is stored under.
    ///
    /// Default: `__token`
    pub token_key: String,

    /// Response header inspected for a rotated credential.
    ///
    /// Default: `x-refreshed-token`
    pub header_key: String,

    /// Where to navigate when the session ends. Empty means "don't navigate".
    pub authenticate_url: String,

    /// Request defaults every authenticated request is layered onto.
    pub defaults: RequestConfig,

    /// Status that ends the session when a request fails with it.
    ///
    /// Default: 401
    pub unauthorized_status: StatusCode,
}

impl InterceptorConfig {
    /// Configuration with defaults, navigating to `authenticate_url` on session end.
    #[must_use]
    pub fn new(authenticate_url: impl Into<String>) -> Self {
        Self {
            authenticate_url: authenticate_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `TOKENFLOW_TOKEN_KEY` | `token_key` |
    /// | `TOKENFLOW_HEADER_KEY` | `header_key` |
    /// | `TOKENFLOW_AUTHENTICATE_URL` | `authenticate_url` |
    /// | `TOKENFLOW_BASE_URL` | `defaults.base_url` |
    /// | `TOKENFLOW_UNAUTHORIZED_STATUS` | `unauthorized_status` |
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(token_key) = lookup("TOKENFLOW_TOKEN_KEY") {
            config.token_key = token_key;
        }
        if let Some(header_key) = lookup("TOKENFLOW_HEADER_KEY") {
            config.header_key = header_key;
        }
        if let Some(url) = lookup("TOKENFLOW_AUTHENTICATE_URL") {
            config.authenticate_url = url;
        }
        if let Some(base_url) = lookup("TOKENFLOW_BASE_URL") {
            config.defaults = config.defaults.with_base_url(base_url);
        }
        if let Some(status) = lookup("TOKENFLOW_UNAUTHORIZED_STATUS") {
            config.unauthorized_status = status
                .trim()
                .parse::<u16>()
                .ok()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .ok_or(ConfigError::InvalidStatus(status))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the durable key.
    #[must_use]
    pub fn with_token_key(mut self, token_key: impl Into<String>) -> Self {
        self.token_key = token_key.into();
        self
    }

    /// Set the refresh header.
    #[must_use]
    pub fn with_header_key(mut self, header_key: impl Into<String>) -> Self {
        self.header_key = header_key.into();
        self
    }

    /// Set the navigation target used on session end.
    #[must_use]
    pub fn with_authenticate_url(mut self, url: impl Into<String>) -> Self {
        self.authenticate_url = url.into();
        self
    }

    /// Set the request defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the status that ends the session.
    #[must_use]
    pub const fn with_unauthorized_status(mut self, status: StatusCode) -> Self {
        self.unauthorized_status = status;
        self
    }

    /// The refresh header as a header name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] if `header_key` is not a
    /// valid header name.
    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.header_key.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(self.header_key.clone()))
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyKey`] for an empty token or header key
    /// - [`ConfigError::InvalidHeaderName`] for a malformed header key
    /// - [`ConfigError::InvalidBaseUrl`] when the default base URL is not an absolute URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_key.is_empty() {
            return Err(ConfigError::EmptyKey { name: "token_key" });
        }
        if self.header_key.is_empty() {
            return Err(ConfigError::EmptyKey { name: "header_key" });
        }
        self.header_name()?;

        if let Some(base_url) = &self.defaults.base_url {
            reqwest::Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            header_key: DEFAULT_HEADER_KEY.to_string(),
            authenticate_url: String::new(),
            defaults: RequestConfig::default(),
            unauthorized_status: StatusCode::UNAUTHORIZED,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = InterceptorConfig::default();
        assert_eq!(config.token_key, "__token");
        assert_eq!(config.header_key, "x-refreshed-token");
        assert!(config.authenticate_url.is_empty());
        assert_eq!(config.unauthorized_status, StatusCode::UNAUTHORIZED);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = InterceptorConfig::from_lookup(lookup(&[
            ("TOKENFLOW_TOKEN_KEY", "session"),
            ("TOKENFLOW_AUTHENTICATE_URL", "/login"),
            ("TOKENFLOW_BASE_URL", "https://api.example.com"),
            ("TOKENFLOW_UNAUTHORIZED_STATUS", "419"),
        ]))
        .unwrap();

        assert_eq!(config.token_key, "session");
        assert_eq!(config.header_key, "x-refreshed-token");
        assert_eq!(config.authenticate_url, "/login");
        assert_eq!(config.defaults.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.unauthorized_status.as_u16(), 419);
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = InterceptorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.token_key, DEFAULT_TOKEN_KEY);
        assert!(config.defaults.base_url.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            InterceptorConfig::from_lookup(lookup(&[("TOKENFLOW_TOKEN_KEY", "")])).unwrap_err(),
            ConfigError::EmptyKey { name: "token_key" }
        );
        assert_eq!(
            InterceptorConfig::from_lookup(lookup(&[("TOKENFLOW_HEADER_KEY", "bad header")]))
                .unwrap_err(),
            ConfigError::InvalidHeaderName("bad header".into())
        );
        assert!(matches!(
            InterceptorConfig::from_lookup(lookup(&[("TOKENFLOW_BASE_URL", "not a url")])),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert_eq!(
            InterceptorConfig::from_lookup(lookup(&[("TOKENFLOW_UNAUTHORIZED_STATUS", "42")]))
                .unwrap_err(),
            ConfigError::InvalidStatus("42".into())
        );
        assert_eq!(
            InterceptorConfig::from_lookup(lookup(&[("TOKENFLOW_UNAUTHORIZED_STATUS", "teapot")]))
                .unwrap_err(),
            ConfigError::InvalidStatus("teapot".into())
        );
    }

    #[test]
    fn test_builders() {
        let config = InterceptorConfig::new("/login")
            .with_token_key("t")
            .with_header_key("X-Token")
            .with_unauthorized_status(StatusCode::FORBIDDEN)
            .with_defaults(RequestConfig::new().with_base_url("http://localhost:8080"));

        assert_eq!(config.authenticate_url, "/login");
        assert_eq!(config.header_name().unwrap(), HeaderName::from_static("x-token"));
        assert_eq!(config.unauthorized_status, StatusCode::FORBIDDEN);
        assert!(config.validate().is_ok());
    }
}
