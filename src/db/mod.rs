pub mod config;
pub mod operations;
pub mod schema;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};
use crate::db::schema::{schema_statements, SCHEMA_VERSION};

pub const PROVIDER: &str = "sqlite";

#[derive(Clone)]
pub struct DatabaseProxy {
    config: DbConfig,
    pool: SqlitePool,
}

impl DatabaseProxy {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;
        Self::connect(config).await
    }

    pub async fn connect(config: DbConfig) -> Result<Arc<Self>, DbInitError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(DbInitError::Sqlx)?
            .create_if_missing(true)
            .journal_mode(config.journal_mode.as_sqlx())
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(DbInitError::Sqlx)?;

        let proxy = Self { config, pool };
        proxy.ensure_schema().await.map_err(DbInitError::Sqlx)?;

        tracing::info!(url = %proxy.config.url, "sqlite pool connected");

        Ok(Arc::new(proxy))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn provider(&self) -> &'static str {
        PROVIDER
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Creates every table that does not exist yet. Safe to run repeatedly.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for stmt in schema_statements() {
            sqlx::query(&stmt).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
