//! Accounts (the `avatar` table) and the lookup the login flow depends on.

use async_trait::async_trait;
use sqlx::{Connection, FromRow, PgPool};
use std::fmt;
use thiserror::Error;
use tracing::{Instrument, error, info_span, instrument};

#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("more than one account matches {0}")]
    Ambiguous(String),
    #[error("account already exists: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to accounts by email.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find the single account whose email equals `email` exactly.
    ///
    /// Returns `Ok(None)` when nothing matches and [`StoreError::Ambiguous`]
    /// when more than one row does.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Whether the backing storage is reachable.
    async fn ping(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account and return it.
    ///
    /// # Errors
    /// Returns [`StoreError::Duplicate`] if the email is taken.
    #[instrument(skip(self, password))]
    pub async fn insert(&self, email: &str, password: &str) -> Result<Account, StoreError> {
        let result = sqlx::query_as::<_, Account>(
            "INSERT INTO avatar (email, password) VALUES ($1, $2) RETURNING id, email, password",
        )
        .bind(email)
        .bind(password)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(account) => Ok(account),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate(email.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        // Two rows are enough to tell "one" from "many".
        let mut rows = sqlx::query_as::<_, Account>(
            "SELECT id, email, password FROM avatar WHERE email = $1 LIMIT 2",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            _ => Err(StoreError::Ambiguous(email.to_string())),
        }
    }

    async fn ping(&self) -> bool {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        match self.pool.acquire().instrument(acquire_span).await {
            Ok(mut conn) => {
                let ping_span =
                    info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
                match conn.ping().instrument(ping_span).await {
                    Ok(()) => true,
                    Err(err) => {
                        error!("Failed to ping database: {err}");
                        false
                    }
                }
            }
            Err(err) => {
                error!("Failed to acquire database connection: {err}");
                false
            }
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
