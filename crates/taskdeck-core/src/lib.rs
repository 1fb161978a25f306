//! Core library for Taskdeck, a small task/project manager with an
//! optional chat agent integration.
//!
//! This crate owns the domain model and validation, the SQLite-backed
//! repository, the process configuration, and the HTTP client for the
//! external agent. The web layer lives in `taskdeck-web`.

pub mod agent;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;

pub use error::{Result, TaskdeckError};
