//! songsort-organize library interface
//!
//! Reorganizes recognized files into a metadata-derived directory layout:
//! pattern rendering, deterministic duplicate resolution, and dry-run or
//! applied copy/move planning. Exposed as a library for integration testing.

pub mod config;
pub mod error;
pub mod hashing;
pub mod manifest;
pub mod organizer;
pub mod pattern;
pub mod planner;
pub mod resolver;

pub use crate::error::{OrganizeError, OrganizeResult};
