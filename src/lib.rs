//! `copper-model` library crate.
//!
//! The binary (`copper`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitted transform and inference service are reusable outside the CLI
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod transform;
pub mod tui;

#[cfg(test)]
pub(crate) mod test_support;
