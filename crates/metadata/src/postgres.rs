//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::*;
use crate::repos::{CounterRepo, VisitRepo};
use crate::store::MetadataStore;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{PgConnection, Pool, Postgres};
use std::str::FromStr;
use tally_core::NewPageVisit;
use tally_core::config::{MetadataConfig, PgSslMode};
use time::OffsetDateTime;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

const DEFAULT_PG_PORT: u16 = 5432;

/// Split the schema into single statements, since a prepared statement
/// cannot hold more than one. Comment lines are dropped first.
fn postgres_schema_statements(schema: &str) -> Vec<String> {
    let sql = schema
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    sql.split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_owned)
        .collect()
}

fn sqlx_ssl_mode(mode: PgSslMode) -> SqlxPgSslMode {
    match mode {
        PgSslMode::Disable => SqlxPgSslMode::Disable,
        PgSslMode::Prefer => SqlxPgSslMode::Prefer,
        PgSslMode::Require => SqlxPgSslMode::Require,
    }
}

fn with_statement_timeout(opts: PgConnectOptions, timeout_ms: Option<u64>) -> PgConnectOptions {
    match timeout_ms {
        Some(ms) => opts.options([("statement_timeout", format!("{ms}ms"))]),
        None => opts,
    }
}

/// Build connect options from a `postgres` metadata section.
///
/// `url` wins over the individual fields. An explicit `ssl_mode` applies to
/// both forms so a URL cannot silently downgrade it.
pub(crate) fn connect_options(config: &MetadataConfig) -> MetadataResult<PgConnectOptions> {
    let MetadataConfig::Postgres {
        url,
        host,
        port,
        username,
        password,
        database,
        ssl_mode,
        statement_timeout_ms,
        ..
    } = config
    else {
        return Err(MetadataError::Config(
            "expected a postgres metadata section".to_string(),
        ));
    };

    let mut opts = match (url, host, database) {
        (Some(url), _, _) => PgConnectOptions::from_str(url)?,
        (None, Some(host), Some(database)) => {
            let mut opts = PgConnectOptions::new()
                .host(host)
                .port(port.unwrap_or(DEFAULT_PG_PORT))
                .database(database);
            if let Some(user) = username {
                opts = opts.username(user);
            }
            if let Some(pass) = password {
                opts = opts.password(pass);
            }
            opts
        }
        _ => {
            return Err(MetadataError::Config(
                "postgres config requires either 'url' or 'host' + 'database'".to_string(),
            ));
        }
    };

    if let Some(mode) = ssl_mode {
        opts = opts.ssl_mode(sqlx_ssl_mode(*mode));
    }
    Ok(with_statement_timeout(opts, *statement_timeout_ms))
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connect using a `postgres` metadata section and run migrations.
    pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Self> {
        let opts = connect_options(config)?;
        let max_connections = match config {
            MetadataConfig::Postgres {
                max_connections, ..
            } => *max_connections,
            MetadataConfig::Sqlite { .. } => 1,
        };

        // Never log the password
        tracing::info!(
            host = opts.get_host(),
            port = opts.get_port(),
            database = opts.get_database().unwrap_or("<default>"),
            username = opts.get_username(),
            max_connections,
            "Connecting to PostgreSQL"
        );
        Self::connect(opts, max_connections).await
    }

    /// Connect using a connection URL and run migrations.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = with_statement_timeout(PgConnectOptions::from_str(url)?, statement_timeout_ms);
        Self::connect(opts, max_connections).await
    }

    async fn connect(opts: PgConnectOptions, max_connections: u32) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Close the pool. Later operations fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Insert the counter if it is missing. Returns true when a row was created.
async fn ensure_counter(
    conn: &mut PgConnection,
    name: &str,
    now: OffsetDateTime,
) -> MetadataResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO counters (name, count, created_at, updated_at)
        VALUES ($1, 0, $2, NULL)
        ON CONFLICT (name) DO NOTHING
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
impl CounterRepo for PostgresStore {
    async fn find_counter(&self, name: &str) -> MetadataResult<Option<CounterRow>> {
        let row = sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE name = $1")
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

        let row = sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE name = $1")
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

        // The row lock taken by UPDATE serializes concurrent increments.
        let row = sqlx::query_as::<_, CounterRow>(
            "UPDATE counters SET count = count + $1, updated_at = $2 WHERE name = $3 RETURNING *",
        )
        .bind(amount)
        .bind(now)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn reset_counter(&self, name: &str, now: OffsetDateTime) -> MetadataResult<CounterRow> {
        let mut tx = self.pool.begin().await?;
        let created = ensure_counter(&mut tx, name, now).await?;

        let row = if created {
            sqlx::query_as::<_, CounterRow>("SELECT * FROM counters WHERE name = $1")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?
        } else {
            sqlx::query_as::<_, CounterRow>(
                "UPDATE counters SET count = 0, updated_at = $1 WHERE name = $2 RETURNING *",
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
impl VisitRepo for PostgresStore {
    async fn record_visit(
        &self,
        visit: &NewPageVisit,
        visited_at: OffsetDateTime,
    ) -> MetadataResult<PageVisitRow> {
        visit.validate()?;

        let row = sqlx::query_as::<_, PageVisitRow>(
            r#"
            INSERT INTO page_visits (page, visitor_ip, user_agent, visited_at)
            VALUES ($1, $2, $3, $4)
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
                sqlx::query_scalar("SELECT COUNT(*) FROM page_visits WHERE page = $1")
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
            "SELECT * FROM page_visits ORDER BY id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
