//! CLI module for the segment-edit library
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use config::EditStep;
pub use main_impl::{main, Cli, CliMaskFormat};
