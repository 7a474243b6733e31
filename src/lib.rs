//! Core library for the AT-command modem simulator.
//!
//! `main.rs` is a thin CLI wrapper over this crate; integration tests
//! exercise the registries, bridge, and dispatcher directly from here.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod registry;
pub mod serial;
