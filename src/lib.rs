//! `neu-grades` library crate.
//!
//! The binary (`neu`) is a thin wrapper around this library so that:
//!
//! - the SSO handshake, table extraction and diffing are testable without a
//!   live portal
//! - the monitor, the CLI commands and the editor share one pipeline

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod logging;
pub mod notify;
pub mod portal;
pub mod report;
pub mod retrieve;
pub mod tui;
