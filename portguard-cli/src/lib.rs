//! portguard CLI library.
//!
//! Command handlers are exposed for integration testing;
//! the `portguard` binary (main.rs) only parses arguments and dispatches.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
