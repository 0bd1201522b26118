//! Pool creation, schema migrations, and database bootstrap/teardown.

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/planner-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Connect using the pool settings carried by `config`.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    debug!(
        db = config.database_name().unwrap_or("-"),
        max_connections = config.max_connections,
        "connected"
    );
    Ok(pool)
}

/// Bring the `plan_records` schema up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(migrations = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// Database names are interpolated into DDL, so only ASCII letters, digits
/// and `_` are accepted.
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {name:?} contains invalid characters");
    }
    Ok(())
}

fn target_name(config: &DbConfig) -> Result<&str> {
    let name = config
        .database_name()
        .context("could not determine database name from URL")?;
    validate_database_name(name)?;
    Ok(name)
}

async fn maintenance_pool(config: &DbConfig) -> Result<PgPool> {
    create_pool(&config.with_database("postgres").with_max_connections(1))
        .await
        .context("failed to reach the maintenance database")
}

/// Create the database named in `config` unless it already exists.
///
/// Returns `true` when the database was created.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<bool> {
    let name = target_name(config)?;
    let maint = maintenance_pool(config).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&maint)
            .await
            .context("failed to query pg_database")?;

    if exists {
        debug!(db = name, "database already exists");
    } else {
        let stmt = format!("CREATE DATABASE {name}");
        maint
            .execute(stmt.as_str())
            .await
            .with_context(|| format!("failed to create database {name}"))?;
        info!(db = name, "database created");
    }

    maint.close().await;
    Ok(!exists)
}

/// Drop the database named in `config`, disconnecting other sessions first.
/// Dropping a missing database is not an error.
pub async fn drop_database(config: &DbConfig) -> Result<()> {
    let name = target_name(config)?;
    let maint = maintenance_pool(config).await?;

    sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(name)
    .execute(&maint)
    .await
    .with_context(|| format!("failed to disconnect sessions from {name}"))?;

    let stmt = format!("DROP DATABASE IF EXISTS {name}");
    maint
        .execute(stmt.as_str())
        .await
        .with_context(|| format!("failed to drop database {name}"))?;

    maint.close().await;
    info!(db = name, "database dropped");
    Ok(())
}

/// Number of rows in `plan_records`. Printed by `planner db-init`.
pub async fn record_count(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plan_records")
        .fetch_one(pool)
        .await
        .context("failed to count plan records")?;
    Ok(count)
}
