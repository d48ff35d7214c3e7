#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use sqlx::sqlite;
use std::str::FromStr;
use tokio::try_join;
use tracing::{Level, event};

pub mod config;
mod r#impl;
pub mod types;

use bh_core::models::{DeveloperId, ProjectId};
use config::SqliteConfig;

/// SQLite database implementation of the relational ports.
///
/// This struct provides separate reader and writer connection pools to a
/// SQLite database. The writer is capped at one connection so that writes are
/// serialized inside the process, which also makes the conditional updates
/// (status transitions, outbox bookkeeping) race-free.
///
/// # Connection Management
///
/// - `reader`: A connection pool for read operations, allowing concurrent reads
/// - `writer`: A single-connection pool for write operations, ensuring serialized writes
#[derive(Clone, Debug)]
pub struct Db {
    /// Connection pool for read operations
    pub reader: sqlx::Pool<sqlx::Sqlite>,
    /// Connection pool for write operations (limited to 1 connection)
    pub writer: sqlx::Pool<sqlx::Sqlite>,
}

impl Db {
    /// Open a connection to the specified SQLite database.
    ///
    /// Creates a new database if one doesn't exist (when `create_if_missing`
    /// is true) and applies all pending migrations.
    ///
    /// The database is configured with WAL journaling, enforced foreign keys
    /// (deleting an auction removes its bids and their outbox entries) and a
    /// busy timeout.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the connection fails or a migration fails to
    /// apply.
    pub async fn open(config: &SqliteConfig) -> Result<Self, sqlx::Error> {
        let db_path = config
            .database_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let options =
            sqlite::SqliteConnectOptions::from_str(db_path.as_deref().unwrap_or(":memory:"))?
                .busy_timeout(config.busy_timeout)
                .foreign_keys(true)
                .journal_mode(sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlite::SqliteSynchronous::Normal)
                .pragma("journal_size_limit", "27103364")
                .pragma("mmap_size", "134217728")
                .pragma("temp_store", "memory")
                .create_if_missing(config.create_if_missing);

        let (reader, writer) = if db_path.is_some() {
            let reader = sqlite::SqlitePoolOptions::new()
                .max_connections(config.max_readers.max(1))
                .connect_with(options.clone());
            let writer = sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options);
            try_join!(reader, writer)?
        } else {
            // every connection to :memory: is a separate database, so both
            // roles share one connection
            let pool = sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;
            (pool.clone(), pool)
        };

        sqlx::migrate!("./schema").run(&writer).await?;
        event!(
            Level::DEBUG,
            path = db_path.as_deref().unwrap_or(":memory:"),
            "database ready"
        );

        Ok(Self { reader, writer })
    }

    /// Add a project to the directory. Registering an existing id is a no-op.
    pub async fn register_project(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            insert into
                project (id, name)
            values
                ($1, $2)
            on conflict
                do nothing
            "#,
        )
        .bind(project_id.0)
        .bind(name)
        .execute(&self.writer)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add a developer to the directory. Registering an existing id is a no-op.
    pub async fn register_developer(
        &self,
        developer_id: DeveloperId,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            insert into
                developer (id, email)
            values
                ($1, $2)
            on conflict
                do nothing
            "#,
        )
        .bind(developer_id.0)
        .bind(email)
        .execute(&self.writer)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
