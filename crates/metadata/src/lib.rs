//! Metadata store abstraction and implementations for Tally.
//!
//! This crate owns the persisted state:
//! - Named counters with get-or-create, increment and reset
//! - The append-only page visit log
//!
//! Both SQLite and PostgreSQL backends create their schema on startup.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use store::{MetadataStore, SqliteStore};

use std::sync::Arc;
use tally_core::config::MetadataConfig;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres { .. } => {
            let store = PostgresStore::from_config(config).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
