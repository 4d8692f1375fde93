use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use murmur_core::{Clock, SystemClock, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error::{DbError, Result};
use crate::schema::SCHEMA;

pub const MEMORY_URL: &str = "sqlite::memory:";

/// Handle to the relational store. Cheap to share behind an `Arc`; all
/// coordination between concurrent requests happens inside SQLite.
#[derive(Debug)]
pub struct MurmurDb {
    pub(crate) pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
}

impl MurmurDb {
    pub async fn new() -> Result<Self> {
        let url = Self::default_url()?;
        Self::connect(&url, Arc::new(SystemClock)).await
    }

    pub async fn new_with_path(path: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::connect(&format!("sqlite:{}?mode=rwc", path), clock).await
    }

    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::connect(MEMORY_URL, clock).await
    }

    pub async fn connect(url: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so pin the pool to one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::info!("Database initialized at: {}", url);

        Ok(Self { pool, clock })
    }

    /// `sqlite:` URL of the database file in the platform data directory.
    pub fn default_url() -> Result<String> {
        let db_path = Self::get_db_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(format!("sqlite:{}?mode=rwc", db_path.display()))
    }

    fn get_db_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "murmur", "murmur").ok_or(DbError::NoDataDir)?;
        Ok(dirs.data_dir().join("murmur.db"))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_millis()
    }
}

/// Ids from `ids` with no matching user row, in the order given.
pub(crate) async fn missing_users(
    conn: &mut SqliteConnection,
    ids: impl IntoIterator<Item = UserId>,
) -> Result<Vec<UserId>> {
    let mut missing = Vec::new();
    for id in ids {
        let found: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        if found == 0 {
            missing.push(id);
        }
    }
    Ok(missing)
}
