//! Connection settings for the relational store.

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// How to open the SQLite database.
///
/// # Examples
///
/// ```
/// use bh_sqlite::config::SqliteConfig;
/// use std::path::PathBuf;
///
/// // In-memory database (default)
/// let config = SqliteConfig::default();
///
/// // On disk, with a larger read pool
/// let config = SqliteConfig {
///     database_path: Some(PathBuf::from("auctions.db")),
///     max_readers: 16,
///     ..SqliteConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    /// Database file; an in-memory database when absent
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Create the file if it does not exist
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// How long a connection waits on a locked database, e.g. `5s`
    #[serde(with = "humantime_serde", default = "default_busy_timeout")]
    pub busy_timeout: Duration,

    /// Size of the read pool for file databases; in-memory databases always
    /// use a single shared connection
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_readers() -> u32 {
    8
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            create_if_missing: true,
            busy_timeout: default_busy_timeout(),
            max_readers: default_max_readers(),
        }
    }
}
