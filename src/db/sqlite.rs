use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqliteExecutor, SqlitePool,
};

use super::LinkStore;
use crate::{
    analytics::MAX_RECENT_BUCKETS,
    error::StoreError,
    models::{ClickByBrowser, ClickByDate, ClickByDevice, Interval, NewClick, NewLink},
};

/// SQLite-backed store. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_url` and apply
    /// the embedded migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(
                database_url
                    .parse::<SqliteConnectOptions>()?
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .foreign_keys(true),
            )
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Call [`SqliteStore::migrate`] before use if
    /// the schema may be missing.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

// ── Sequence ───────────────────────────────────────────────────────────────

/// `link_id_seq` is AUTOINCREMENT, so a rowid is never reissued even after
/// the row is deleted or the surrounding insert fails.
async fn draw_id<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let id = sqlx::query("INSERT INTO link_id_seq DEFAULT VALUES")
        .execute(executor)
        .await?
        .last_insert_rowid();
    Ok(id)
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(err),
    }
}

/// strftime pattern producing the bucket label for `interval`.
fn bucket_pattern(interval: Interval) -> &'static str {
    match interval {
        Interval::Day => "%Y-%m-%d",
        Interval::Month => "%Y-%m-01",
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn next_sequence_value(&self) -> Result<i64, StoreError> {
        let id = draw_id(&self.pool).await?;

        // Only the high-water mark in sqlite_sequence matters.
        sqlx::query("DELETE FROM link_id_seq WHERE id < ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn create_link(&self, link: &NewLink) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let id = match link.id {
            Some(id) => id,
            None => draw_id(&mut *tx).await?,
        };

        sqlx::query(
            "INSERT INTO links (id, original_url, short_code, is_custom, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(&link.original_url)
        .bind(&link.short_code)
        .bind(link.is_custom)
        .bind(Utc::now().naive_utc())
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_url_by_code(&self, code: &str) -> Result<Option<String>, StoreError> {
        let url: Option<String> =
            sqlx::query_scalar("SELECT original_url FROM links WHERE short_code = ?1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(url)
    }

    async fn get_id_by_code(&self, code: &str) -> Result<Option<i64>, StoreError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM links WHERE short_code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, StoreError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM links WHERE short_code = ?1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists != 0)
    }

    async fn create_click(&self, click: &NewClick) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO clicks
                 (link_id, ip_address, user_agent, device, browser, clicked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(click.link_id)
        .bind(&click.ip_address)
        .bind(&click.user_agent)
        .bind(&click.device)
        .bind(&click.browser)
        .bind(click.clicked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn total_clicks(&self, code: &str) -> Result<i64, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM clicks c
             JOIN links l ON l.id = c.link_id
             WHERE l.short_code = ?1",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn clicks_by_browser(&self, code: &str) -> Result<Vec<ClickByBrowser>, StoreError> {
        let rows: Vec<ClickByBrowser> = sqlx::query_as(
            "SELECT c.browser AS browser, COUNT(*) AS clicks
             FROM clicks c
             JOIN links l ON l.id = c.link_id
             WHERE l.short_code = ?1
             GROUP BY c.browser
             ORDER BY clicks DESC",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn clicks_by_device(&self, code: &str) -> Result<Vec<ClickByDevice>, StoreError> {
        let rows: Vec<ClickByDevice> = sqlx::query_as(
            "SELECT c.device AS device, COUNT(*) AS clicks
             FROM clicks c
             JOIN links l ON l.id = c.link_id
             WHERE l.short_code = ?1
             GROUP BY c.device
             ORDER BY clicks DESC",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn recent_clicks(
        &self,
        code: &str,
        interval: Interval,
    ) -> Result<Vec<ClickByDate>, StoreError> {
        // Latest buckets first so LIMIT keeps the newest, then flip to ascending.
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT bucket, clicks FROM (
                 SELECT strftime(?2, c.clicked_at) AS bucket, COUNT(*) AS clicks
                 FROM clicks c
                 JOIN links l ON l.id = c.link_id
                 WHERE l.short_code = ?1
                 GROUP BY bucket
                 ORDER BY bucket DESC
                 LIMIT ?3
             )
             ORDER BY bucket ASC",
        )
        .bind(code)
        .bind(bucket_pattern(interval))
        .bind(MAX_RECENT_BUCKETS as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(bucket, clicks)| {
                let bucket = bucket
                    .ok_or_else(|| StoreError::Corrupt("click with unreadable timestamp".into()))?;
                let date = NaiveDate::parse_from_str(&bucket, "%Y-%m-%d")
                    .map_err(|e| StoreError::Corrupt(format!("bucket '{bucket}': {e}")))?;
                Ok(ClickByDate { date, clicks })
            })
            .collect()
    }
}
