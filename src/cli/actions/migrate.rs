use crate::{cli::globals::GlobalArgs, db};
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub db: db::DbConfig,
    pub dry_run: bool,
}

/// Execute the migrate action.
/// # Errors
/// Returns an error if the migrations cannot be read or applied.
pub async fn execute(args: Args) -> Result<()> {
    let dir = args.globals.migrations_dir();
    let migrator = db::migrate::migrator(&dir)
        .await
        .with_context(|| format!("Failed to read migrations from {}", dir.display()))?;

    let pool = db::connect(&args.db)
        .await
        .context("Failed to connect to the database")?;

    let pending = db::migrate::run(&migrator, &pool, args.dry_run)
        .await
        .context("Failed to migrate the database")?;

    if pending.is_empty() {
        info!("schema is up to date");
    } else if args.dry_run {
        for migration in &pending {
            println!("{} {}", migration.version, migration.description);
        }
    }

    pool.close().await;

    Ok(())
}
