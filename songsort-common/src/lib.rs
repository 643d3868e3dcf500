//! # songsort Common Library
//!
//! Shared code for the songsort tools including:
//! - Recognition data model (source files, outcomes, recognized records)
//! - Results dataset persistence (atomic JSON writes, loading)
//! - Audio extension allow-list
//! - TOML configuration loading
//! - Logging bootstrap

pub mod config;
pub mod dataset;
pub mod error;
pub mod extensions;
pub mod logging;
pub mod models;

pub use error::{Error, Result};
pub use models::{RecognitionOutcome, RecognizedRecord, ResultSet, SourceFile};
