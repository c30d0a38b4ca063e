//! # sl-protocol
//!
//! Core protocol definitions and data models for steplog.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (`.steplog/config.toml`)
//! - Pipeline execution state as reported by the backend
//! - Log line records and the endpoints they are served from
//! - Notifications surfaced to the user
//!
//! ## Modules
//!
//! - [`config_models`]: Global configuration from config.toml
//! - [`execution_models`]: Executions, stages, steps and their status
//! - [`log_models`]: Log line records and log endpoint paths
//! - [`notification`]: Transient user-visible notifications
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, chrono and uuid
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other steplog crates

pub mod config_models;
pub mod execution_models;
pub mod log_models;
pub mod notification;

// Re-export all public types for convenience
pub use config_models::*;
pub use execution_models::*;
pub use log_models::*;
pub use notification::*;
