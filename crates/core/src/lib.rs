//! # sl-core
//!
//! Live step log pipeline for steplog.
//!
//! This crate provides:
//! - ANSI sanitizing of raw log output into styled lines
//! - Redraw-aligned batching of streamed lines
//! - The live stream session state machine
//! - Per-step view control choosing between live and historical logs
//! - HTTP/SSE transport and the background worker driving it
//! - Configuration loading from `.steplog/` and logging setup
//!
//! ## Modules
//!
//! - [`render`]: Sanitizer, batch scheduler and log pane
//! - [`session`]: Live stream session
//! - [`controller`]: Step view controller
//! - [`transport`]: Backend access
//! - [`worker`]: Background tasks and wired step views
//! - [`config`]: Configuration loading
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod controller;
pub mod logging;
pub mod render;
pub mod session;
pub mod transport;
pub mod worker;
