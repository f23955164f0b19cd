//! PostgreSQL implementation of the URL repository.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};

use crate::config::PoolSettings;
use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlRepository;
use crate::error::{StoreError, is_undefined_table, map_sqlx_error};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS urls (
        short_url TEXT PRIMARY KEY,
        full_url  TEXT NOT NULL,
        uuid      TEXT NOT NULL DEFAULT '',
        deleted   BOOLEAN NOT NULL DEFAULT FALSE
    )
"#;

// Uniqueness of full_url only applies to active rows, so a deleted URL can be
// shortened again.
const CREATE_ACTIVE_URL_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS urls_full_url_active_key
        ON urls (full_url)
        WHERE NOT deleted
"#;

const INSERT_URL: &str = "INSERT INTO urls (short_url, full_url, uuid) VALUES ($1, $2, $3)";

/// PostgreSQL repository storing records in the `urls` table.
///
/// The table is created on first write: an insert that fails with
/// "undefined table" creates the schema and is retried exactly once.
/// Deletion only sets the `deleted` flag.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the pool cannot be created or the
    /// connectivity check fails.
    pub async fn connect(dsn: &str, settings: &PoolSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connect_timeout))
            .idle_timeout(Some(Duration::from_secs(settings.idle_timeout)))
            .max_lifetime(Some(Duration::from_secs(settings.max_lifetime)))
            .connect(dsn)
            .await
            .map_err(|e| StoreError::unavailable(format!("cannot connect to database: {e}")))?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        info!(
            max_connections = settings.max_connections,
            "Connected to database"
        );

        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the `urls` table and its active-URL index if they are missing.
    ///
    /// Concurrent creators can collide in the system catalog; any failure here
    /// is reported as [`StoreError::Unavailable`], never as a record conflict.
    pub async fn create_table(&self) -> Result<(), StoreError> {
        for statement in [CREATE_TABLE, CREATE_ACTIVE_URL_INDEX] {
            sqlx::query(statement)
                .execute(self.pool.as_ref())
                .await
                .map_err(|e| StoreError::unavailable(format!("cannot create urls table: {e}")))?;
        }
        info!("Created urls table");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

async fn insert_record<'e, E>(executor: E, record: &UrlRecord) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(INSERT_URL)
        .bind(record.short_key.as_str())
        .bind(record.original_url.as_str())
        .bind(record.owner_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn save(&self, record: UrlRecord) -> Result<(), StoreError> {
        record.validate()?;

        match insert_record(self.pool.as_ref(), &record).await {
            Ok(()) => {}
            Err(e) if is_undefined_table(&e) => {
                warn!("urls table is missing, creating it and retrying insert");
                self.create_table().await?;
                insert_record(self.pool.as_ref(), &record).await?;
            }
            Err(e) => return Err(map_sqlx_error(e)),
        }

        debug!(short_key = %record.short_key, "Record saved");
        Ok(())
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            record.validate()?;
        }

        // The statement text is the same for every row, so sqlx prepares it once
        // per connection and reuses it for the rest of the batch.
        let mut tx = self.pool.begin().await?;

        for (position, record) in records.iter().enumerate() {
            match insert_record(&mut *tx, record).await {
                Ok(()) => {}
                Err(e) if position == 0 && is_undefined_table(&e) => {
                    // The failed statement aborted the transaction; start over once
                    // the table exists.
                    tx.rollback().await?;
                    warn!("urls table is missing, creating it and restarting batch");
                    self.create_table().await?;
                    tx = self.pool.begin().await?;
                    insert_record(&mut *tx, record).await?;
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "Failed to roll back batch insert");
                    }
                    return Err(map_sqlx_error(e));
                }
            }
        }

        tx.commit().await?;
        debug!(count = records.len(), "Batch saved");
        Ok(())
    }

    async fn get_original_url(&self, short_key: &str) -> Result<String, StoreError> {
        let row = sqlx::query_as::<_, (String, bool)>(
            "SELECT full_url, deleted FROM urls WHERE short_url = $1 LIMIT 1",
        )
        .bind(short_key)
        .fetch_optional(self.pool.as_ref())
        .await;

        let row = match row {
            Ok(row) => row,
            Err(e) if is_undefined_table(&e) => None,
            Err(e) => return Err(map_sqlx_error(e)),
        };

        match row {
            None => Err(StoreError::not_found(format!("short key {short_key}"))),
            Some((_, true)) => Err(StoreError::gone(format!(
                "short key {short_key} was deleted"
            ))),
            Some((full_url, false)) => Ok(full_url),
        }
    }

    async fn get_short_url(&self, original_url: &str) -> Result<String, StoreError> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT short_url FROM urls WHERE full_url = $1 AND NOT deleted LIMIT 1",
        )
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await;

        let short_url = match row {
            Ok(short_url) => short_url,
            Err(e) if is_undefined_table(&e) => None,
            Err(e) => return Err(map_sqlx_error(e)),
        };

        short_url.ok_or_else(|| StoreError::not_found(format!("original URL {original_url}")))
    }

    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT short_url, full_url FROM urls WHERE uuid = $1 AND NOT deleted",
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) if is_undefined_table(&e) => Vec::new(),
            Err(e) => return Err(map_sqlx_error(e)),
        };

        Ok(rows
            .into_iter()
            .map(|(short_url, full_url)| UrlRecord::new(owner_id, short_url, full_url))
            .collect())
    }

    async fn delete(&self, owner_id: &str, short_keys: Vec<String>) -> Result<u64, StoreError> {
        // Anonymous rows have no owner entitled to delete them.
        if owner_id.is_empty() || short_keys.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE urls
            SET deleted = TRUE
            WHERE uuid = $1
              AND short_url = ANY($2)
              AND NOT deleted
            "#,
        )
        .bind(owner_id)
        .bind(&short_keys)
        .execute(self.pool.as_ref())
        .await;

        let deleted = match result {
            Ok(result) => result.rows_affected(),
            Err(e) if is_undefined_table(&e) => 0,
            Err(e) => return Err(map_sqlx_error(e)),
        };

        debug!(
            owner_id,
            requested = short_keys.len(),
            deleted,
            "Records deleted"
        );
        Ok(deleted)
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("Database pool closed");
        }
    }

    async fn health_check(&self) -> bool {
        if self.pool.is_closed() {
            return false;
        }
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
