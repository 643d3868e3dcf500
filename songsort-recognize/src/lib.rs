//! songsort-recognize library interface
//!
//! Batch recognition of an audio folder through an external recognizer:
//! rate-limited, bounded-concurrency, checkpointed, and tolerant of per-file
//! failures. Exposed as a library for integration testing.

pub mod config;
pub mod error;
pub mod services;
pub mod workflow;

pub use crate::error::{RecognizeError, RecognizeResult};
