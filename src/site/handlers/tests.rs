#![allow(clippy::unwrap_used)]

use super::CurrentAccount;
use crate::site::{
    AuthConfig, SiteState,
    account::{Account, AccountStore, StoreError},
    auth::verify::{MSG_INCORRECT, MSG_NOT_GIVEN},
    config::JwtConfig,
    now_unix_seconds, router,
    session::{MemorySessionStore, Session, SessionStore},
    token::verify_hs256,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use secrecy::SecretString;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

struct Accounts(Vec<Account>);

#[async_trait]
impl AccountStore for Accounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.0.iter().find(|a| a.email == email).cloned())
    }
}

fn alice() -> Account {
    Account {
        id: 42,
        email: "alice@example.com".to_string(),
        password: "s3cret".to_string(),
    }
}

fn app(config: AuthConfig) -> (Router, Arc<MemorySessionStore>) {
    let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
    let state = SiteState::new(
        config,
        Arc::new(Accounts(vec![alice()])),
        sessions.clone(),
    );
    (router(Arc::new(state)), sessions)
}

fn token_config() -> AuthConfig {
    AuthConfig::new().with_jwt(JwtConfig::new(true, Some(SecretString::from("k3y"))))
}

fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair from the response's `Set-Cookie`.
fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(ToString::to_string)
}

fn cookie_value(pair: &str) -> &str {
    pair.split_once('=').map_or("", |(_, value)| value)
}

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

async fn session_json(app: &Router, cookie: &str) -> Value {
    let response = app
        .clone()
        .oneshot(get_request("/session", Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn non_post_login_redirects_without_changes() {
    let (app, sessions) = app(AuthConfig::new());

    let response = app
        .clone()
        .oneshot(get_request("/login", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let cookie = set_cookie(&response).unwrap();

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Redirecting...");

    let stored = sessions.get(cookie_value(&cookie)).await.unwrap();
    assert_eq!(stored.avatar_id(), None);
    assert!(stored.flash_messages().is_empty());
}

#[tokio::test]
async fn missing_fields_flash_without_identity() {
    let (app, _) = app(AuthConfig::new());

    let response = app
        .clone()
        .oneshot(form_request("/login", "email=alice%40example.com", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.extensions().get::<CurrentAccount>().is_none());
    let cookie = set_cookie(&response).unwrap();

    let json = session_json(&app, &cookie).await;
    assert_eq!(json["avatar_id"], Value::Null);
    assert_eq!(json["flash"][0]["message"], MSG_NOT_GIVEN);
    assert_eq!(json["flash"][0]["domain"], "_warp:login");

    // Flash messages are shown once.
    let json = session_json(&app, &cookie).await;
    assert_eq!(json["flash"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_account_and_wrong_password_share_a_message() {
    let (app, _) = app(AuthConfig::new());

    for body in [
        "email=mallory%40example.com&password=s3cret",
        "email=alice%40example.com&password=guess",
    ] {
        let response = app
            .clone()
            .oneshot(form_request("/login", body, None))
            .await
            .unwrap();
        let cookie = set_cookie(&response).unwrap();

        let json = session_json(&app, &cookie).await;
        assert_eq!(json["avatar_id"], Value::Null);
        assert_eq!(json["flash"][0]["message"], MSG_INCORRECT);
    }
}

#[tokio::test]
async fn server_login_sets_identity() {
    let (app, _) = app(AuthConfig::new());

    let response = app
        .clone()
        .oneshot(form_request(
            "/login",
            "email=alice%40example.com&password=s3cret",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert_eq!(
        response.extensions().get::<CurrentAccount>(),
        Some(&CurrentAccount(alice()))
    );
    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.starts_with("WARPSITE_SESSION="));

    let json = session_json(&app, &cookie).await;
    assert_eq!(json["avatar_id"], 42);
    assert_eq!(json["flash"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn token_login_issues_signed_cookie() {
    let (app, sessions) = app(token_config());

    let response = app
        .clone()
        .oneshot(form_request(
            "/login",
            "email=alice%40example.com&password=s3cret",
            None,
        ))
        .await
        .unwrap();
    let issued_at = now_unix_seconds();

    assert_eq!(response.status(), StatusCode::FOUND);
    let cookie = set_cookie(&response).unwrap();
    let claims = verify_hs256(cookie_value(&cookie), b"k3y", issued_at).unwrap();
    assert_eq!(claims.avatar_id, 42);
    assert_eq!(claims.username, "alice@example.com");
    assert!((claims.exp - (issued_at + 86_400)).abs() <= 1);

    // The token replaces the server session entirely.
    assert!(sessions.is_empty().await);

    let json = session_json(&app, &cookie).await;
    assert_eq!(json["avatar_id"], 42);
}

#[tokio::test]
async fn logout_without_identity_still_redirects() {
    let (app, _) = app(AuthConfig::new());

    let response = app
        .clone()
        .oneshot(get_request("/logout/goodbye", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/goodbye");
}

#[tokio::test]
async fn logout_clears_server_identity() {
    let (app, sessions) = app(AuthConfig::new());
    let mut session = Session::new("known".to_string());
    session.set_avatar_id(Some(42));
    sessions.put(session).await;

    let response = app
        .clone()
        .oneshot(form_request("/logout", "", Some("WARPSITE_SESSION=known")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(set_cookie(&response).is_none());
    assert_eq!(sessions.get("known").await.unwrap().avatar_id(), None);
}

#[tokio::test]
async fn logout_replaces_token_session() {
    let (app, _) = app(token_config());

    let login = app
        .clone()
        .oneshot(form_request(
            "/login",
            "email=alice%40example.com&password=s3cret",
            None,
        ))
        .await
        .unwrap();
    let token_cookie = set_cookie(&login).unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/logout", Some(&token_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let cookie = set_cookie(&response).unwrap();
    assert_ne!(cookie, token_cookie);
    let json = session_json(&app, &cookie).await;
    assert_eq!(json["avatar_id"], Value::Null);
}

#[tokio::test]
async fn after_login_target_is_consumed_once() {
    let (app, sessions) = app(AuthConfig::new());
    let mut session = Session::new("known".to_string());
    session.set_after_login(Some("/dashboard".to_string()));
    sessions.put(session).await;

    let credentials = "email=alice%40example.com&password=s3cret";
    let cookie = "WARPSITE_SESSION=known";

    let first = app
        .clone()
        .oneshot(form_request("/login/extra", credentials, Some(cookie)))
        .await
        .unwrap();
    assert_eq!(location(&first), "/dashboard");

    let second = app
        .clone()
        .oneshot(form_request("/login/extra", credentials, Some(cookie)))
        .await
        .unwrap();
    assert_eq!(location(&second), "/extra");
}

#[tokio::test]
async fn cookie_name_follows_site_path() {
    let (app, _) = app(AuthConfig::new().with_site_path("blog"));

    let response = app
        .clone()
        .oneshot(get_request("/login", None))
        .await
        .unwrap();

    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.starts_with("WARPSITE_SESSION_blog="));
    let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(header.contains("Path=/"));
}

#[tokio::test]
async fn health_reports_build_info() {
    let (app, _) = app(AuthConfig::new());

    let response = app
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let x_app = response.headers().get("X-App").unwrap().to_str().unwrap();
    assert!(x_app.starts_with(env!("CARGO_PKG_NAME")));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["database"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn root_greets() {
    let (app, _) = app(AuthConfig::new());

    let response = app.oneshot(get_request("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Warpsite");
}
