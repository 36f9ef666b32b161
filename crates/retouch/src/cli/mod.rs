//! Command handlers for the `retouch` binary.

pub mod config;
pub mod process;
