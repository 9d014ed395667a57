use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::finish_with_redirect;
use crate::site::{LOGOUT_PATH, SiteState, auth::redirect::postpath, session};

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 302, description = "Session identity cleared, redirect to the remaining path"),
        (status = 500, description = "Session could not be established")
    ),
    tag = "auth"
)]
#[instrument(skip(headers, state), fields(path = %uri.path()))]
pub async fn logout(uri: Uri, headers: HeaderMap, state: Extension<Arc<SiteState>>) -> Response {
    let mut session = match session::resolve(&headers, state.config(), state.sessions()).await {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response();
        }
    };

    if let Err(err) = session.clear_identity() {
        error!("Failed to replace token session: {err:#}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response();
    }
    debug!("session identity cleared");

    finish_with_redirect(&state, session, &postpath(uri.path(), LOGOUT_PATH), None).await
}
