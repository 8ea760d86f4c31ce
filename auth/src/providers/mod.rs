//! Seams to the environment the interceptor runs in.
//!
//! These traits stand for everything outside the dispatch pipeline that the
//! interceptor touches synchronously: the durable key-value medium holding the
//! credential, and the navigation target used when a session ends. The HTTP
//! side lives in [`crate::transport::RequestExecutor`].
//!
//! Concrete implementations live in [`crate::stores`]; in-memory doubles in
//! `crate::mocks` (feature `test-utils`).

pub mod navigator;
pub mod storage;

pub use navigator::Navigator;
pub use storage::CredentialStorage;
