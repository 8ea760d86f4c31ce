//! # Tokenflow Auth
//!
//! Bearer-credential handling for the Tokenflow dispatch pipeline.
//!
//! The crate provides one middleware stage, the [`AuthenticatedInterceptor`],
//! which owns a single session credential and turns authenticated request
//! actions into HTTP calls:
//!
//! - the credential is read from durable storage once, at startup
//! - every request carries `Authorization: bearer <token>` while one is held
//! - a rotated token announced in a response header replaces the current one
//! - a rejected credential (401) ends the session: the token is cleared and the
//!   client navigates to the authenticate URL
//!
//! ## Architecture
//!
//! ```text
//! send(Auth(Request)) → AuthenticatedInterceptor → Reducer(on_start) → Reducer(Auth(Request))
//!                              │
//!                              └─ Effect::Stream: progress* → on_response | on_error
//! ```
//!
//! The interceptor never swallows or rewrites actions. The transport, the
//! durable medium and the navigation target sit behind traits
//! ([`RequestExecutor`], [`CredentialStorage`], [`Navigator`]) with production
//! implementations ([`ReqwestExecutor`], [`FileStorage`]) and in-memory mocks
//! (feature `test-utils`).
//!
//! ## Example
//!
//! ```rust,ignore
//! use tokenflow_auth::*;
//!
//! let interceptor = AuthenticatedInterceptor::from_config(
//!     InterceptorConfig::from_env()?,
//!     ReqwestExecutor::new(),
//!     Arc::new(FileStorage::new("credentials.json")),
//!     Arc::new(NoNavigation),
//! )?;
//!
//! let store = Store::new(ProfileState::default(), ProfileReducer, ())
//!     .with_middleware(interceptor);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod providers;
pub mod request;
pub mod stores;
pub mod transport;

// Mock implementations (for testing)
#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use reqwest;
pub use actions::{
    AuthenticatedAction, AuthenticatedActionKind, AuthenticatedRequest, authenticated_log_out,
    authenticated_request,
};
pub use config::InterceptorConfig;
pub use credential::CredentialStore;
pub use error::{ConfigError, StorageError};
pub use http::ReqwestExecutor;
pub use interceptor::AuthenticatedInterceptor;
pub use providers::navigator::NoNavigation;
pub use providers::{CredentialStorage, Navigator};
pub use request::{BasicAuth, ParamsSerializer, RequestBody, RequestConfig, ResponseType, build_request};
pub use stores::FileStorage;
pub use transport::{
    HttpResponse, ProgressEvent, ProgressHandlers, RequestError, RequestErrorKind, RequestExecutor,
    ResponseBody,
};
