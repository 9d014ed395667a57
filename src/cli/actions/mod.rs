pub mod adduser;
pub mod migrate;
pub mod server;

// Internal "interpreter" for `Action`.
mod run;

use crate::{
    cli::globals::GlobalArgs,
    db::{self, DbConfig},
};
use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    AddUser(adduser::Args),
    Migrate(migrate::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Connect to the site database, migrating it first unless told not to.
///
/// A site without a `migrations/` directory is used as is.
///
/// # Errors
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn open_database(globals: &GlobalArgs, config: &DbConfig) -> Result<PgPool> {
    let pool = db::connect(config)
        .await
        .context("Failed to connect to the database")?;

    if globals.skip_schema_check {
        debug!("schema check skipped");
        return Ok(pool);
    }

    let dir = globals.migrations_dir();
    if !dir.is_dir() {
        warn!("no migrations directory at {}, schema left as is", dir.display());
        return Ok(pool);
    }

    let migrator = db::migrate::migrator(&dir)
        .await
        .with_context(|| format!("Failed to read migrations from {}", dir.display()))?;
    db::migrate::run(&migrator, &pool, false)
        .await
        .context("Failed to migrate the database")?;

    Ok(pool)
}
