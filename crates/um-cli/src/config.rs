//! Configuration loading and management.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use um_core::{DEFAULT_BUCKET_MINUTES, DEFAULT_ENDED_SOON_THRESHOLD_MS, DEFAULT_GRACE_MS, PackageId};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the event log database file.
    pub database_path: PathBuf,

    /// IANA timezone used to resolve local dates (e.g., "Asia/Tokyo").
    pub timezone: String,

    /// Inactivity gap, in milliseconds, that still counts as the same session.
    pub grace_period_ms: i64,

    /// Width of a report time-of-day bucket, in minutes.
    pub bucket_minutes: u32,

    /// Window after a suggestion prompt, in milliseconds, within which a
    /// session end counts as "ended soon".
    pub ended_soon_threshold_ms: i64,

    /// Packages tracked before any target set change event is seen.
    pub target_packages: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timezone", &self.timezone)
            .field("grace_period_ms", &self.grace_period_ms)
            .field("bucket_minutes", &self.bucket_minutes)
            .field("ended_soon_threshold_ms", &self.ended_soon_threshold_ms)
            .field("target_packages", &self.target_packages)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("um.db"),
            timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
            grace_period_ms: DEFAULT_GRACE_MS,
            bucket_minutes: DEFAULT_BUCKET_MINUTES,
            ended_soon_threshold_ms: DEFAULT_ENDED_SOON_THRESHOLD_MS,
            target_packages: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (UM_*)
        figment = figment.merge(Env::prefixed("UM_"));

        figment.extract()
    }

    /// The configured timezone, parsed.
    pub fn tz(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {e}", self.timezone))
    }

    /// The configured initial target set, validated.
    pub fn target_set(&self) -> anyhow::Result<BTreeSet<PackageId>> {
        self.target_packages
            .iter()
            .map(|p| {
                PackageId::new(p.clone()).with_context(|| format!("invalid target package {p:?}"))
            })
            .collect()
    }
}

/// Returns the platform-specific config directory for um.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("um"))
}

/// Returns the platform-specific data directory for um.
///
/// On Linux: `~/.local/share/um`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("um"))
}
