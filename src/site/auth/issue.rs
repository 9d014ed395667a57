use tracing::{debug, instrument};

use crate::site::{
    account::Account,
    config::{AuthConfig, TOKEN_TTL_SECONDS},
    session::RequestSession,
    token::{self, TokenClaims, sign_hs256},
};

/// How the verified account was attached to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server session now carries the account id.
    Server(Account),
    /// The session was replaced by a signed token.
    Token(TokenClaims),
}

/// Establish the session identity for a verified account.
///
/// In token mode the server session is left untouched and replaced by a token
/// expiring 24 hours after `now_unix_seconds`; otherwise the server session's
/// account id is set. If signing fails nothing changes.
///
/// # Errors
/// Returns an error if the token cannot be signed.
#[instrument(skip(account, config, session), fields(avatar_id = account.id))]
pub fn issue(
    account: &Account,
    config: &AuthConfig,
    session: &mut RequestSession,
    now_unix_seconds: i64,
) -> Result<SessionOutcome, token::Error> {
    if config.jwt().session() {
        let claims = TokenClaims {
            avatar_id: account.id,
            username: account.email.clone(),
            exp: now_unix_seconds + TOKEN_TTL_SECONDS,
        };
        let encoded = sign_hs256(config.jwt().secret(), &claims)?;
        session.replace_with_token(encoded, claims.clone());

        debug!("issued session token");

        Ok(SessionOutcome::Token(claims))
    } else {
        session.set_avatar_id(Some(account.id));

        debug!("server session authenticated");

        Ok(SessionOutcome::Server(account.clone()))
    }
}
