use crate::{
    cli::{actions::open_database, globals::GlobalArgs},
    db::DbConfig,
    site::{self, AuthConfig, SiteState, account::PgAccountStore, session::MemorySessionStore},
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub port: u16,
    pub db: DbConfig,
    pub auth: AuthConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database cannot be prepared or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = open_database(&args.globals, &args.db).await?;

    let sessions = MemorySessionStore::new(Duration::from_secs(args.auth.session_ttl_seconds()));
    let state = SiteState::new(
        args.auth,
        Arc::new(PgAccountStore::new(pool)),
        Arc::new(sessions),
    );

    site::new(args.port, Arc::new(state)).await
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        site_dir = %args.globals.site_dir().display(),
        cookie = %args.auth.cookie_name(),
        token_sessions = args.auth.jwt().session(),
        "starting site server"
    );
}
