//! CLI command implementations.

pub mod assemble;
pub mod clean;
pub mod config;
