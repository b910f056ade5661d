//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use um_core::{Decision, PermissionKind, PermissionState};

/// App usage monitor.
///
/// Records app lifecycle events into an append-only log and projects them
/// into sessions, monitoring availability, and daily usage reports.
#[derive(Debug, Parser)]
#[command(name = "um", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Append a lifecycle event to the log.
    Log {
        #[command(subcommand)]
        event: LogEvent,
    },

    /// Show the daily usage report.
    Report {
        /// Local date to report on (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Report on yesterday.
        #[arg(long, conflicts_with = "date")]
        last_day: bool,

        /// Report on this many days, ending at the chosen date.
        #[arg(long, default_value_t = 1)]
        days: u32,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List projected sessions touching a date.
    Sessions {
        /// Local date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List monitoring availability periods for a date.
    Monitoring {
        /// Local date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show event log health.
    Status,

    /// Poll the log and reprint today's summary when it changes.
    Watch {
        /// Seconds between polls.
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

/// Event types that can be appended to the log.
///
/// Every variant takes an optional `--at` RFC 3339 timestamp; without it the
/// current time is recorded.
#[derive(Debug, Subcommand)]
pub enum LogEvent {
    /// The monitoring service started.
    ServiceStarted {
        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// The monitoring service stopped.
    ServiceStopped {
        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// The screen turned on or off.
    Screen {
        /// New screen state.
        state: ScreenArg,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// The foreground application changed.
    Foreground {
        /// Package now in the foreground. Omit when the foreground cleared
        /// (launcher, lock screen).
        #[arg(long)]
        package: Option<String>,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// The monitored target set was replaced.
    Targets {
        /// Packages in the new target set. Repeat for each package.
        #[arg(long = "package")]
        packages: Vec<String>,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// A permission the service depends on changed state.
    Permission {
        /// Which permission changed.
        kind: PermissionKindArg,

        /// Its new state.
        state: PermissionStateArg,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// A suggestion prompt was shown to the user.
    SuggestionShown {
        /// Identifier of the prompt.
        #[arg(long)]
        id: String,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// The user responded to a suggestion prompt.
    SuggestionDecision {
        /// Identifier of the prompt.
        #[arg(long)]
        id: String,

        /// The response.
        #[arg(long)]
        decision: DecisionArg,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// An app setting changed.
    Settings {
        /// Which setting changed.
        #[arg(long)]
        key: String,

        /// Human-readable description of the change.
        #[arg(long)]
        description: String,

        /// Event timestamp (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

/// Screen state argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScreenArg {
    On,
    Off,
}

impl ScreenArg {
    /// Whether the screen is on.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Permission kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PermissionKindArg {
    UsageAccess,
    Overlay,
    Notification,
}

impl From<PermissionKindArg> for PermissionKind {
    fn from(arg: PermissionKindArg) -> Self {
        match arg {
            PermissionKindArg::UsageAccess => Self::UsageAccess,
            PermissionKindArg::Overlay => Self::Overlay,
            PermissionKindArg::Notification => Self::Notification,
        }
    }
}

/// Permission state argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PermissionStateArg {
    Granted,
    Revoked,
}

impl From<PermissionStateArg> for PermissionState {
    fn from(arg: PermissionStateArg) -> Self {
        match arg {
            PermissionStateArg::Granted => Self::Granted,
            PermissionStateArg::Revoked => Self::Revoked,
        }
    }
}

/// Suggestion decision argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Snoozed,
    Dismissed,
    DisabledForSession,
}

impl From<DecisionArg> for Decision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Snoozed => Self::Snoozed,
            DecisionArg::Dismissed => Self::Dismissed,
            DecisionArg::DisabledForSession => Self::DisabledForSession,
        }
    }
}
