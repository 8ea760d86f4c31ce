//! Mock implementations for testing.
//!
//! This module provides simple, in-memory implementations of the storage,
//! executor and navigation seams for use in unit and integration tests.

pub mod executor;
pub mod navigator;
pub mod storage;

pub use executor::{MockExecutor, ScriptedReply};
pub use navigator::RecordingNavigator;
pub use storage::MemoryStorage;
