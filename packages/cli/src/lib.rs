//! Command-line host for the katsuyo drill engines.
//!
//! Reads reference data and progress files from disk, runs one engine
//! operation and reports the result as JSON.

pub mod commands;
pub mod config;
pub mod data;
pub mod logging;
