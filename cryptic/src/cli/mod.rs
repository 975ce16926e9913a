//! Command-line interface
//!
//! Argument parsing lives in [`args`]; [`commands`] routes each subcommand
//! to its handler.

pub mod args;
pub mod commands;
