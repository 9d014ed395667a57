use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::site::{
    SiteState,
    session::{self, FlashMessage},
};

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionResponse {
    pub avatar_id: Option<i64>,
    pub flash: Vec<FlashMessage>,
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current session; pending flash messages are consumed", body = SessionResponse),
        (status = 500, description = "Session could not be established")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<SiteState>>) -> Response {
    let mut session = match session::resolve(&headers, state.config(), state.sessions()).await {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response();
        }
    };

    let body = SessionResponse {
        avatar_id: session.avatar_id(),
        flash: session.take_flash_messages(),
    };

    session.save(state.sessions()).await;

    let mut response = Json(body).into_response();
    match session.cookie(state.config()) {
        Ok(Some(cookie)) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Ok(None) => {}
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    response
}
