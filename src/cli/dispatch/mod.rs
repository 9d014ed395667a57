use crate::{
    cli::{
        actions::{Action, adduser, migrate, server},
        commands::{self, auth, db as db_args},
        globals::GlobalArgs,
    },
    db::{DbConfig, IsolationLevel},
    site::{AuthConfig, config::JwtConfig},
};
use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;

/// Map the parsed command line to the action to run.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = globals(matches);

    match matches.subcommand() {
        Some((commands::CMD_SERVE, sub)) => Ok(Action::Server(server::Args {
            port: sub.get_one::<u16>(auth::ARG_PORT).copied().unwrap_or(8080),
            db: db_config(sub)?,
            auth: auth_config(sub),
            globals,
        })),
        Some((commands::CMD_ADDUSER, sub)) => Ok(Action::AddUser(adduser::Args {
            email: sub
                .get_one::<String>("email")
                .cloned()
                .context("missing required argument: --email")?,
            password: sub
                .get_one::<String>("password")
                .map(|p| SecretString::from(p.as_str()))
                .context("missing required argument: --password")?,
            db: db_config(sub)?,
            globals,
        })),
        Some((commands::CMD_MIGRATE, sub)) => Ok(Action::Migrate(migrate::Args {
            dry_run: sub.get_flag("dry-run"),
            db: db_config(sub)?,
            globals,
        })),
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }
}

fn globals(matches: &ArgMatches) -> GlobalArgs {
    let site_dir = matches
        .get_one::<String>("site-dir")
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    GlobalArgs::new(site_dir).with_skip_schema_check(matches.get_flag("skip-schema-check"))
}

fn db_config(matches: &ArgMatches) -> Result<DbConfig> {
    let dsn = matches
        .get_one::<String>(db_args::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let isolation_level = matches
        .get_one::<String>(db_args::ARG_ISOLATION_LEVEL)
        .map(|level| level.parse::<IsolationLevel>())
        .transpose()
        .context("invalid --isolation-level")?
        .unwrap_or_default();

    Ok(DbConfig::new(dsn)
        .with_isolation_level(isolation_level)
        .with_trace(matches.get_flag(db_args::ARG_DB_TRACE)))
}

fn auth_config(matches: &ArgMatches) -> AuthConfig {
    let jwt = JwtConfig::new(
        matches.get_flag(auth::ARG_JWT_SESSION),
        matches
            .get_one::<String>(auth::ARG_JWT_SECRET)
            .map(|secret| SecretString::from(secret.as_str())),
    );

    let mut config = AuthConfig::new().with_jwt(jwt);

    if let Some(prefix) = matches.get_one::<String>(auth::ARG_COOKIE_PREFIX) {
        config = config.with_cookie_prefix(prefix.clone());
    }
    if let Some(site_path) = matches.get_one::<String>(auth::ARG_SITE_PATH) {
        config = config.with_site_path(site_path);
    }
    if let Some(ttl) = matches.get_one::<u64>(auth::ARG_SESSION_TTL) {
        config = config.with_session_ttl_seconds(*ttl);
    }

    config
}
