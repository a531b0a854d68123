//! Metadata store trait and the SQLite implementation.

use crate::error::MetadataResult;
use crate::repos::{CounterRepo, VisitRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: CounterRepo + VisitRepo + Send + Sync {
    /// Create tables and indexes that do not exist yet. Safe to run repeatedly.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity with a trivial round-trip.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database and run migrations.
    ///
    /// The path `:memory:` opens a private in-memory database that lives as
    /// long as the store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let in_memory = path == Path::new(":memory:");

        let opts = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        };
        // Prevent transient "database is locked" errors under concurrent access.
        let opts = opts.busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits one writer at a time; a single connection keeps
            // concurrent handlers from failing with "database is locked".
            .max_connections(1)
            // An in-memory database disappears with its last connection.
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        tracing::info!(path = %path.display(), "Opened SQLite metadata store");

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the pool. Later operations fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use sqlx::SqliteConnection;
    use tally_core::NewPageVisit;
    use time::OffsetDateTime;

    /// Insert the counter if it is missing. Returns true when a row was created.
    async fn ensure_counter(
        conn: &mut SqliteConnection,
        name: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO counters (name, count, created_at, updated_at)
            VALUES (?, 0, ?, NULL)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            tracing::info!(counter = name, "Created counter");
        }
        Ok(created)
    }

    #[async_trait]
    impl CounterRepo for SqliteStore {
        async fn find_counter(&self, name: &str) -> MetadataResult<Option<CounterRow>> {
            let row = sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_or_create_counter(
            &self,
            name: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<CounterRow> {
            let mut tx = self.pool.begin().await?;
            ensure_counter(&mut tx, name, now).await?;

            let row = sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE name = ?")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(row)
        }

        async fn increment_counter(
            &self,
            name: &str,
            amount: i64,
            now: OffsetDateTime,
        ) -> MetadataResult<CounterRow> {
            let mut tx = self.pool.begin().await?;
            ensure_counter(&mut tx, name, now).await?;

            // Add in SQL so the new value never depends on a stale read.
            let row = sqlx::query_as::<_, CounterRow>(
                "UPDATE counters SET count = count + ?, updated_at = ? WHERE name = ? RETURNING *",
            )
            .bind(amount)
            .bind(now)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(row)
        }

        async fn reset_counter(
            &self,
            name: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<CounterRow> {
            let mut tx = self.pool.begin().await?;
            let created = ensure_counter(&mut tx, name, now).await?;

            let row = if created {
                sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE name = ?")
                    .bind(name)
                    .fetch_one(&mut *tx)
                    .await?
            } else {
                sqlx::query_as::<_, CounterRow>(
                    "UPDATE counters SET count = 0, updated_at = ? WHERE name = ? RETURNING *",
                )
                .bind(now)
                .bind(name)
                .fetch_one(&mut *tx)
                .await?
            };

            tx.commit().await?;
            Ok(row)
        }
    }

    #[async_trait]
    impl VisitRepo for SqliteStore {
        async fn record_visit(
            &self,
            visit: &NewPageVisit,
            visited_at: OffsetDateTime,
        ) -> MetadataResult<PageVisitRow> {
            visit.validate()?;

            let row = sqlx::query_as::<_, PageVisitRow>(
                r#"
                INSERT INTO page_visits (page, visitor_ip, user_agent, visited_at)
                VALUES (?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&visit.page)
            .bind(&visit.visitor_ip)
            .bind(&visit.user_agent)
            .bind(visited_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        }

        async fn count_visits(&self, page: Option<&str>) -> MetadataResult<u64> {
            let count: i64 = match page {
                Some(page) => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM page_visits WHERE page = ?")
                        .bind(page)
                        .fetch_one(&self.pool)
                        .await?
                }
                None => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM page_visits")
                        .fetch_one(&self.pool)
                        .await?
                }
            };
            Ok(count as u64)
        }

        async fn recent_visits(&self, limit: u32) -> MetadataResult<Vec<PageVisitRow>> {
            let rows = sqlx::query_as::<_, PageVisitRow>(
                "SELECT * FROM page_visits ORDER BY id DESC LIMIT ?",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS counters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE DEFAULT 'main' CHECK (length(name) <= 100),
    count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS page_visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page TEXT NOT NULL CHECK (length(page) <= 255),
    visitor_ip TEXT CHECK (visitor_ip IS NULL OR length(visitor_ip) <= 45),
    user_agent TEXT CHECK (user_agent IS NULL OR length(user_agent) <= 500),
    visited_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_visits_page ON page_visits (page);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::NewPageVisit;
    use time::OffsetDateTime;

    async fn file_store() -> (tempfile::TempDir, SqliteStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("nested/tally.db"))
            .await
            .unwrap();
        (temp, store)
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (_temp, store) = file_store().await;
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_or_create_creates_once() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        assert!(store.find_counter("main").await.unwrap().is_none());

        let now = OffsetDateTime::now_utc();
        let first = store.get_or_create_counter("main", now).await.unwrap();
        assert_eq!(first.name, "main");
        assert_eq!(first.count, 0);
        assert!(first.updated_at.is_none());

        let later = now + time::Duration::seconds(5);
        let second = store.get_or_create_counter("main", later).await.unwrap();
        assert_eq!(first, second);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counters")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_increment_creates_missing_counter() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let now = OffsetDateTime::now_utc();

        let row = store.increment_counter("main", 4, now).await.unwrap();
        assert_eq!(row.count, 4);
        assert!(row.updated_at.is_some());

        let row = store.increment_counter("main", -10, now).await.unwrap();
        assert_eq!(row.count, -6);
    }

    #[tokio::test]
    async fn test_reset_fresh_and_existing() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let now = OffsetDateTime::now_utc();

        let fresh = store.reset_counter("main", now).await.unwrap();
        assert_eq!(fresh.count, 0);
        assert!(fresh.updated_at.is_none());

        store.increment_counter("main", 9, now).await.unwrap();
        let reset = store.reset_counter("main", now).await.unwrap();
        assert_eq!(reset.count, 0);
        assert_eq!(reset.id, fresh.id);
        assert!(reset.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_counters_are_independent_by_name() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let now = OffsetDateTime::now_utc();

        store.increment_counter("main", 2, now).await.unwrap();
        let other = store.increment_counter("secondary", 7, now).await.unwrap();
        let main = store.get_or_create_counter("main", now).await.unwrap();

        assert_eq!(main.count, 2);
        assert_eq!(other.count, 7);
        assert_ne!(main.id, other.id);
    }

    #[tokio::test]
    async fn test_counter_persists_across_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tally.db");
        let now = OffsetDateTime::now_utc();

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store.increment_counter("main", 3, now).await.unwrap();
            store.close().await;
        }

        let store = SqliteStore::new(&path).await.unwrap();
        let row = store.find_counter("main").await.unwrap().unwrap();
        assert_eq!(row.count, 3);
    }

    #[tokio::test]
    async fn test_health_check_fails_after_close() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.close().await;
        assert!(store.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_record_and_list_visits() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let now = OffsetDateTime::now_utc();

        let first = store
            .record_visit(
                &NewPageVisit::new("/").with_visitor_ip("2001:db8::1"),
                now,
            )
            .await
            .unwrap();
        assert_eq!(first.page, "/");
        assert_eq!(first.visitor_ip.as_deref(), Some("2001:db8::1"));
        assert!(first.user_agent.is_none());

        store
            .record_visit(&NewPageVisit::new("/about").with_user_agent("curl/8.5.0"), now)
            .await
            .unwrap();
        store.record_visit(&NewPageVisit::new("/"), now).await.unwrap();

        assert_eq!(store.count_visits(None).await.unwrap(), 3);
        assert_eq!(store.count_visits(Some("/")).await.unwrap(), 2);
        assert_eq!(store.count_visits(Some("/missing")).await.unwrap(), 0);

        let recent = store.recent_visits(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].page, "/");
        assert_eq!(recent[1].page, "/about");
        assert!(recent[0].id > recent[1].id);
    }

    #[tokio::test]
    async fn test_record_visit_rejects_invalid_input() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        let result = store
            .record_visit(&NewPageVisit::new(""), OffsetDateTime::now_utc())
            .await;
        assert!(matches!(result, Err(crate::MetadataError::Invalid(_))));
        assert_eq!(store.count_visits(None).await.unwrap(), 0);
    }
}
