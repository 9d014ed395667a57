//! Schema migrations read from the site's `migrations/` directory.

use sqlx::{
    PgPool,
    migrate::{Migrate, MigrateError, Migrator},
};
use std::path::Path;
use tracing::{info, instrument};

/// A migration not yet applied to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub version: i64,
    pub description: String,
}

/// Load the migrator for a site.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub async fn migrator(dir: &Path) -> Result<Migrator, MigrateError> {
    Migrator::new(dir).await
}

/// List migrations that have not been applied yet.
///
/// Read only: a database that was never migrated has no bookkeeping table,
/// and every up migration is reported as pending.
///
/// # Errors
/// Returns an error if the applied migrations cannot be read.
#[instrument(skip(migrator, pool))]
pub async fn pending(migrator: &Migrator, pool: &PgPool) -> Result<Vec<Pending>, MigrateError> {
    let mut conn = pool.acquire().await?;

    let table: Option<String> =
        sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations')::text")
            .fetch_one(&mut *conn)
            .await?;

    let applied: Vec<i64> = if table.is_some() {
        conn.list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect()
    } else {
        Vec::new()
    };

    Ok(unapplied(migrator, &applied))
}

fn unapplied(migrator: &Migrator, applied: &[i64]) -> Vec<Pending> {
    migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !applied.contains(&m.version))
        .map(|m| Pending {
            version: m.version,
            description: m.description.to_string(),
        })
        .collect()
}

/// Bring the database up to the schema the site expects.
///
/// With `dry_run`, only report what would be applied.
///
/// # Errors
/// Returns an error if a migration fails.
pub async fn run(migrator: &Migrator, pool: &PgPool, dry_run: bool) -> Result<Vec<Pending>, MigrateError> {
    let pending = pending(migrator, pool).await?;

    for migration in &pending {
        info!(
            version = migration.version,
            dry_run,
            "pending migration: {}", migration.description
        );
    }

    if !dry_run && !pending.is_empty() {
        migrator.run(pool).await?;
        info!("applied {} migration(s)", pending.len());
    }

    Ok(pending)
}
