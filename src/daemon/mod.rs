//! Daemon module for the live timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and update fan-out
//! - `sampler`: Periodic task that drives the engine while running
//! - `service`: The authoritative timer shared by every caller
//! - `ipc`: Unix socket server and request handling
//! - `runner`: Daemon wiring and signal handling

pub mod ipc;
pub mod runner;
pub mod sampler;
pub mod service;
pub mod timer;

pub use runner::run_daemon;
pub use service::TimerService;
pub use timer::{TimerEngine, TimerError, TimerEvent, TimerUpdate};
