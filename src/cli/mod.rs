//! Command-line interface
//!
//! `startnode` runs a node; every other command is a client request sent to a
//! running node.

pub mod commands;

pub use commands::{Command, Opt};
