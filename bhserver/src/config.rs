//! Application configuration management.
//!
//! Configuration is assembled from default values, an optional configuration
//! file and environment variables, in increasing order of precedence.

use std::time::Duration;

use bh_core::models::{DeveloperId, ProjectId};
use bh_sqlite::Db;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

use crate::{Cli, PropagationConfig, Scheduler};

/// The main application configuration that composes all component configs
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    /// Web server configuration (bind address, page limit, error exposure)
    #[serde(default)]
    pub server: bh_axum::config::AxumConfig,

    /// Relational store configuration
    #[serde(default)]
    pub database: bh_sqlite::config::SqliteConfig,

    /// Document replica configuration
    #[serde(default)]
    pub document: bh_docstore::DocumentConfig,

    /// Ledger replica configuration
    #[serde(default)]
    pub ledger: bh_ledger::LedgerConfig,

    /// When to run the expiry sweep
    #[serde(default)]
    pub schedule: Scheduler,

    /// The propagation worker
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Verification code settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Directory rows to register at startup
    #[serde(default)]
    pub seed: SeedConfig,
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file given by the CLI
    /// 3. Default values (lowest priority)
    ///
    /// Environment variables are mapped using the pattern:
    /// `APP_<SECTION>__<KEY>` maps to `<section>.<key>`
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Keep the relational store on disk
    /// export APP_DATABASE__DATABASE_PATH="/data/auctions.db"
    ///
    /// # Turn on the ledger replica
    /// export APP_LEDGER__ENABLED=true
    ///
    /// # Sweep expired auctions every minute
    /// export APP_SCHEDULE__EVERY="1m"
    /// ```
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = &cli.config {
            if path.exists() {
                config = config.add_source(config::File::from(path.as_path()))
            } else {
                return Err(anyhow::anyhow!(
                    "Config file {} does not exist",
                    path.display()
                ));
            }
        }

        // APP_SERVER__BIND_ADDRESS maps to server.bind_address
        config = config.add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let built_config = config.build()?;
        built_config.try_deserialize().map_err(Into::into)
    }
}

/// How long issued verification codes stay valid
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// Lifetime of a code, e.g. `10m`
    #[serde(with = "humantime_serde", default = "default_ttl")]
    pub ttl: Duration,
}

fn default_ttl() -> Duration {
    Duration::from_secs(600)
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

/// A project to register at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedProject {
    /// The project id
    pub id: ProjectId,
    /// Display name
    pub name: String,
}

/// A developer to register at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedDeveloper {
    /// The developer id
    pub id: DeveloperId,
    /// Contact address
    pub email: String,
}

/// The projects and developers the directory should know about.
///
/// Registration is idempotent, so the same seed can be applied on every start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SeedConfig {
    /// Projects auctions can be created for
    #[serde(default)]
    pub projects: Vec<SeedProject>,
    /// Developers that may bid
    #[serde(default)]
    pub developers: Vec<SeedDeveloper>,
}

impl SeedConfig {
    /// Register every seeded row that is not present yet
    pub async fn apply(&self, db: &Db) -> anyhow::Result<()> {
        let mut added = 0;
        for project in &self.projects {
            added += usize::from(db.register_project(project.id, &project.name).await?);
        }
        for developer in &self.developers {
            added += usize::from(
                db.register_developer(developer.id, &developer.email)
                    .await?,
            );
        }
        if added > 0 {
            event!(Level::INFO, added, "seeded directory");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let cli = Cli {
            config: None,
            secret: "secret".into(),
            schema: None,
        };
        let config = AppConfig::load(&cli)?;
        assert_eq!(config.server.page_limit, 100);
        assert_eq!(config.document.collection, "bids");
        assert_eq!(config.verification.ttl, Duration::from_secs(600));
        assert_eq!(config.propagation.batch_size, 50);
        assert!(config.seed.projects.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let cli = Cli {
            config: Some("/nonexistent/bhserver.toml".into()),
            secret: "secret".into(),
            schema: None,
        };
        assert!(AppConfig::load(&cli).is_err());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() -> anyhow::Result<()> {
        let db = Db::open(&bh_sqlite::config::SqliteConfig::default()).await?;
        let seed = SeedConfig {
            projects: vec![SeedProject {
                id: ProjectId(1),
                name: "Harbour".into(),
            }],
            developers: vec![SeedDeveloper {
                id: DeveloperId(9),
                email: "dev@example.com".into(),
            }],
        };
        seed.apply(&db).await?;
        seed.apply(&db).await?;
        assert!(!db.register_project(ProjectId(1), "Harbour").await?);
        Ok(())
    }
}
