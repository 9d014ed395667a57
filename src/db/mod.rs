//! Database session factory.
//!
//! Builds the `sqlx` Postgres pool the site runs on. DSNs written for other
//! toolkits are accepted: the `postgres` scheme is rewritten to `postgresql`
//! and any query-string options are dropped before connecting.

pub mod migrate;

use sqlx::{
    ConnectOptions, Executor,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid database connection string: {0}")]
    Dsn(String),
    #[error("unsupported database scheme: {0}")]
    Scheme(String),
    #[error("unknown isolation level: {0}")]
    IsolationLevel(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Transaction isolation applied to every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }

    /// Statement run once per connection to pin its isolation level.
    #[must_use]
    pub const fn session_statement(self) -> &'static str {
        match self {
            Self::ReadUncommitted => {
                "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"
            }
            Self::ReadCommitted => {
                "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL READ COMMITTED"
            }
            Self::RepeatableRead => {
                "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL REPEATABLE READ"
            }
            Self::Serializable => {
                "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL SERIALIZABLE"
            }
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match normalized.as_str() {
            "READ UNCOMMITTED" => Ok(Self::ReadUncommitted),
            "READ COMMITTED" => Ok(Self::ReadCommitted),
            "REPEATABLE READ" => Ok(Self::RepeatableRead),
            "SERIALIZABLE" => Ok(Self::Serializable),
            _ => Err(Error::IsolationLevel(s.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct DbConfig {
    dsn: String,
    isolation_level: IsolationLevel,
    trace: bool,
}

impl DbConfig {
    #[must_use]
    pub fn new(dsn: String) -> Self {
        Self {
            dsn,
            isolation_level: IsolationLevel::default(),
            trace: false,
        }
    }

    #[must_use]
    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    #[must_use]
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Connection options derived from the normalized DSN.
    ///
    /// # Errors
    /// Returns an error if the DSN cannot be parsed.
    pub fn connect_options(&self) -> Result<PgConnectOptions, Error> {
        let dsn = normalize_dsn(&self.dsn)?;
        let options = PgConnectOptions::from_str(&dsn)?;
        if self.trace {
            Ok(options)
        } else {
            Ok(options.disable_statement_logging())
        }
    }
}

// The DSN may carry a password.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = Url::parse(&self.dsn).map_or_else(
            |_| "***".to_string(),
            |mut url| {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            },
        );
        f.debug_struct("DbConfig")
            .field("dsn", &redacted)
            .field("isolation_level", &self.isolation_level)
            .field("trace", &self.trace)
            .finish()
    }
}

/// Rewrite the scheme to `postgresql` and drop query-string options.
///
/// # Errors
/// Returns an error if the DSN is not a URL or uses a non-Postgres scheme.
pub fn normalize_dsn(dsn: &str) -> Result<String, Error> {
    let url = Url::parse(dsn).map_err(|e| Error::Dsn(e.to_string()))?;

    match url.scheme() {
        "postgres" | "postgresql" => {}
        other => return Err(Error::Scheme(other.to_string())),
    }

    // Url::set_scheme refuses some special-scheme transitions, so rebuild from the tail.
    let serialized = url.as_str();
    let rest = serialized
        .split_once("://")
        .map_or(serialized, |(_, rest)| rest);
    let rest = rest.split_once('?').map_or(rest, |(head, _)| head);

    Ok(format!("postgresql://{rest}"))
}

/// Create the connection pool.
///
/// # Errors
/// Returns an error if the DSN is invalid or the database is unreachable.
#[instrument(skip(config), fields(isolation_level = %config.isolation_level()))]
pub async fn connect(config: &DbConfig) -> Result<PgPool, Error> {
    let options = config.connect_options()?;
    let statement = config.isolation_level().session_statement();

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(statement).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await?;

    debug!("database pool ready");

    Ok(pool)
}
