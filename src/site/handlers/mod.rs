pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod logout;
pub use self::logout::logout;

pub mod session;
pub use self::session::session;

#[cfg(test)]
mod tests;

use axum::{
    body::Body,
    http::{
        HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use super::{
    account::Account,
    auth::redirect,
    session::RequestSession,
    state::SiteState,
};

/// Account authenticated by the current request, for downstream layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAccount(pub Account);

pub async fn root() -> &'static str {
    "Warpsite"
}

/// Persist the session and answer with the post-action redirect.
pub(crate) async fn finish_with_redirect(
    state: &SiteState,
    mut session: RequestSession,
    postpath: &[&str],
    current: Option<Account>,
) -> Response {
    let target = redirect::resolve(&mut session, postpath);
    debug!("redirecting to {target}");

    session.save(state.sessions()).await;

    let location = HeaderValue::from_str(&target).unwrap_or_else(|_| HeaderValue::from_static("/"));
    let mut response = (StatusCode::FOUND, Body::from("Redirecting...")).into_response();
    response.headers_mut().insert(LOCATION, location);

    match session.cookie(state.config()) {
        Ok(Some(cookie)) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Ok(None) => {}
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    if let Some(account) = current {
        response.extensions_mut().insert(CurrentAccount(account));
    }

    response
}
