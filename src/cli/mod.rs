//! Command-line interface support
//!
//! Argument structs and handlers for the `sales-analytics` binary.

pub mod commands;
pub mod error;
