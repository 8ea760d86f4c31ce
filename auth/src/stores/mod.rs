//! Credential storage implementations.
//!
//! - **File storage** - JSON document on disk, one entry per key

pub mod file;

pub use file::FileStorage;
