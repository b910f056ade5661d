//! CLI subcommand implementations.

pub mod log;
pub mod monitoring;
pub mod report;
pub mod sessions;
pub mod status;
pub mod util;
pub mod watch;
