use axum::http::Method;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::site::{
    account::{Account, AccountStore, StoreError},
    config::PasswordChecker,
    token,
};

pub const MSG_NOT_GIVEN: &str = "Login failed: Email or password not given";
pub const MSG_INCORRECT: &str = "Login failed: Email or password incorrect";

/// Submitted login form (`application/x-www-form-urlencoded`).
#[derive(Clone, Default, Deserialize, ToSchema)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoginFailure {
    #[error("login requires POST")]
    NotPost,
    #[error("email or password not given")]
    MissingCredentials,
    #[error("no account for the given email")]
    AccountNotFound,
    #[error("password mismatch")]
    BadPassword,
    #[error("account lookup failed: {0}")]
    Lookup(#[from] StoreError),
    #[error("failed to sign session token: {0}")]
    Signing(#[from] token::Error),
}

impl LoginFailure {
    /// Text shown to the user, if any.
    ///
    /// Every failure after the form check shares one message, so the response
    /// never tells whether the email exists.
    #[must_use]
    pub fn flash_message(&self) -> Option<&'static str> {
        match self {
            Self::NotPost => None,
            Self::MissingCredentials => Some(MSG_NOT_GIVEN),
            Self::AccountNotFound | Self::BadPassword | Self::Lookup(_) | Self::Signing(_) => {
                Some(MSG_INCORRECT)
            }
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Check submitted credentials and return the matching account.
///
/// # Errors
/// Returns the reason the login failed; see [`LoginFailure::flash_message`]
/// for what the user gets to see.
#[instrument(skip(form, accounts, checker))]
pub async fn verify(
    method: &Method,
    form: Option<&LoginForm>,
    accounts: &dyn AccountStore,
    checker: &PasswordChecker,
) -> Result<Account, LoginFailure> {
    if *method != Method::POST {
        return Err(LoginFailure::NotPost);
    }

    let form = form.cloned().unwrap_or_default();
    let (Some(email), Some(password)) = (
        non_empty(form.email.as_ref()),
        non_empty(form.password.as_ref()),
    ) else {
        debug!("email or password missing");
        return Err(LoginFailure::MissingCredentials);
    };

    let account = match accounts.find_by_email(email).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!("account not found");
            return Err(LoginFailure::AccountNotFound);
        }
        Err(err) => {
            error!("account lookup failed: {err}");
            return Err(err.into());
        }
    };

    if !checker(&account, password.as_bytes()) {
        debug!(avatar_id = account.id, "password mismatch");
        return Err(LoginFailure::BadPassword);
    }

    Ok(account)
}
