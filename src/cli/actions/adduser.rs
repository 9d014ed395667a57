use crate::{
    cli::{actions::open_database, globals::GlobalArgs},
    db::DbConfig,
    site::account::{PgAccountStore, StoreError},
};
use anyhow::{Result, anyhow, bail};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub db: DbConfig,
    pub email: String,
    pub password: SecretString,
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Execute the adduser action.
/// # Errors
/// Returns an error if the email is invalid, already taken, or the database fails.
pub async fn execute(args: Args) -> Result<()> {
    if !valid_email(&args.email) {
        bail!("invalid email address: {}", args.email);
    }
    if args.password.expose_secret().is_empty() {
        bail!("password must not be empty");
    }

    let pool = open_database(&args.globals, &args.db).await?;
    let store = PgAccountStore::new(pool);

    match store
        .insert(&args.email, args.password.expose_secret())
        .await
    {
        Ok(account) => {
            info!(avatar_id = account.id, "account created for {}", account.email);
            Ok(())
        }
        Err(StoreError::Duplicate(email)) => Err(anyhow!("an account for {email} already exists")),
        Err(err) => Err(anyhow!(err).context("Failed to create account")),
    }
}
