//! Usage monitor CLI library.
//!
//! This crate provides the CLI interface over the event log (`um-db`) and
//! the projection engine (`um-core`).

mod cli;
pub mod commands;
mod config;
mod refresh;

pub use cli::{
    Cli, Commands, DecisionArg, LogEvent, PermissionKindArg, PermissionStateArg, ScreenArg,
};
pub use config::Config;
pub use refresh::LatestSlot;
