use axum::{
    extract::{Extension, Form},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::finish_with_redirect;
use crate::site::{
    LOGIN_PATH, SiteState,
    auth::{LoginFailure, LoginForm, SessionOutcome, issue, redirect::postpath, verify},
    now_unix_seconds,
    session::{self, LOGIN_FLASH_DOMAIN},
};

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Redirect after the login attempt; failures leave a flash message in the session"),
        (status = 500, description = "Session could not be established")
    ),
    tag = "auth"
)]
#[instrument(skip(headers, state, form), fields(path = %uri.path()))]
pub async fn login(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<SiteState>>,
    form: Option<Form<LoginForm>>,
) -> Response {
    let mut session = match session::resolve(&headers, state.config(), state.sessions()).await {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response();
        }
    };

    let config = state.config();
    let form = form.map(|Form(form)| form);

    let verified = verify(
        &method,
        form.as_ref(),
        state.accounts(),
        config.password_checker(),
    )
    .await;

    let result: Result<SessionOutcome, LoginFailure> = match verified {
        Ok(account) => issue(&account, config, &mut session, now_unix_seconds())
            .map_err(Into::into),
        Err(failure) => Err(failure),
    };

    let current = match result {
        Ok(SessionOutcome::Server(account)) => {
            debug!(avatar_id = account.id, "login succeeded");
            Some(account)
        }
        Ok(SessionOutcome::Token(claims)) => {
            debug!(avatar_id = claims.avatar_id, "login succeeded with token session");
            None
        }
        Err(failure) => {
            debug!("login failed: {failure}");
            if let Some(message) = failure.flash_message() {
                session.add_flash_message(message, LOGIN_FLASH_DOMAIN);
            }
            None
        }
    };

    finish_with_redirect(&state, session, &postpath(uri.path(), LOGIN_PATH), current).await
}
