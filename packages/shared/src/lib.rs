//! Shared utilities for the trebuchet workspace.
//!
//! - `logger`: tracing subscriber setup
//! - `time`: clock abstraction and UTC timestamp helpers

pub mod logger;
pub mod time;
