//! Per-client sessions and cookie-to-session resolution.
//!
//! A request sees one [`RequestSession`]: either a server-side [`Session`]
//! kept in a [`SessionStore`], or a stateless token session decoded from the
//! cookie. Server sessions hold the account id, the after-login target and
//! flash messages; token sessions only carry their signed claims.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use serde::Serialize;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;
use utoipa::ToSchema;

use super::{
    config::AuthConfig,
    now_unix_seconds,
    token::{TokenClaims, verify_hs256},
};

/// Flash domain used by the login handlers.
pub const LOGIN_FLASH_DOMAIN: &str = "_warp:login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FlashMessage {
    pub message: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    uid: String,
    avatar_id: Option<i64>,
    after_login: Option<String>,
    flash: Vec<FlashMessage>,
}

impl Session {
    #[must_use]
    pub fn new(uid: String) -> Self {
        Self {
            uid,
            avatar_id: None,
            after_login: None,
            flash: Vec::new(),
        }
    }

    /// Start a session with a fresh random uid.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        Ok(Self::new(generate_session_uid()?))
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn avatar_id(&self) -> Option<i64> {
        self.avatar_id
    }

    pub fn set_avatar_id(&mut self, avatar_id: Option<i64>) {
        self.avatar_id = avatar_id;
    }

    #[must_use]
    pub fn after_login(&self) -> Option<&str> {
        self.after_login.as_deref()
    }

    pub fn set_after_login(&mut self, target: Option<String>) {
        self.after_login = target;
    }

    pub fn add_flash_message(&mut self, message: &str, domain: &str) {
        self.flash.push(FlashMessage {
            message: message.to_string(),
            domain: domain.to_string(),
        });
    }

    #[must_use]
    pub fn flash_messages(&self) -> &[FlashMessage] {
        &self.flash
    }

    /// Drain flash messages; each is shown once.
    pub fn take_flash_messages(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.flash)
    }
}

/// Server-side session storage keyed by session uid.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, uid: &str) -> Option<Session>;
    async fn put(&self, session: Session);
}

/// In-process store; sessions expire after `ttl` without access.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, (Instant, Session)>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, uid: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let expired = match sessions.get_mut(uid) {
            None => return None,
            Some((touched, _)) if now.duration_since(*touched) >= self.ttl => true,
            Some((touched, _)) => {
                *touched = now;
                false
            }
        };

        if expired {
            debug!("session expired");
            sessions.remove(uid);
            return None;
        }

        sessions.get(uid).map(|(_, session)| session.clone())
    }

    async fn put(&self, session: Session) {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, (touched, _)| now.duration_since(*touched) < self.ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "evicted expired sessions");
        }

        sessions.insert(session.uid.clone(), (now, session));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSession {
    token: String,
    claims: TokenClaims,
}

impl TokenSession {
    #[must_use]
    pub fn new(token: String, claims: TokenClaims) -> Self {
        Self { token, claims }
    }

    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    Server(Session),
    Token(TokenSession),
}

/// The session attached to the request being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSession {
    kind: SessionKind,
    set_cookie: bool,
}

impl RequestSession {
    #[must_use]
    pub fn existing(session: Session) -> Self {
        Self {
            kind: SessionKind::Server(session),
            set_cookie: false,
        }
    }

    #[must_use]
    pub fn fresh(session: Session) -> Self {
        Self {
            kind: SessionKind::Server(session),
            set_cookie: true,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    /// Value stored in the session cookie.
    #[must_use]
    pub fn uid(&self) -> &str {
        match &self.kind {
            SessionKind::Server(session) => session.uid(),
            SessionKind::Token(token) => &token.token,
        }
    }

    #[must_use]
    pub fn avatar_id(&self) -> Option<i64> {
        match &self.kind {
            SessionKind::Server(session) => session.avatar_id(),
            SessionKind::Token(token) => Some(token.claims.avatar_id),
        }
    }

    #[must_use]
    pub fn needs_cookie(&self) -> bool {
        self.set_cookie
    }

    /// Associate an account with the server session.
    ///
    /// Token sessions are immutable; this is a no-op for them.
    pub fn set_avatar_id(&mut self, avatar_id: Option<i64>) {
        match &mut self.kind {
            SessionKind::Server(session) => session.set_avatar_id(avatar_id),
            SessionKind::Token(_) => debug!("token sessions cannot change identity"),
        }
    }

    /// Drop the session identity.
    ///
    /// A token cannot be revoked, so a token session is swapped for a new,
    /// anonymous server session whose cookie overwrites the token.
    ///
    /// # Errors
    /// Returns an error if a new session uid cannot be generated.
    pub fn clear_identity(&mut self) -> Result<()> {
        if let SessionKind::Server(session) = &mut self.kind {
            session.set_avatar_id(None);
            return Ok(());
        }
        *self = Self::fresh(Session::generate()?);
        Ok(())
    }

    /// Replace the active session with a signed token session.
    pub fn replace_with_token(&mut self, token: String, claims: TokenClaims) {
        self.kind = SessionKind::Token(TokenSession::new(token, claims));
        self.set_cookie = true;
    }

    /// Consume the after-login target, but only once the session has an identity.
    pub fn take_after_login(&mut self) -> Option<String> {
        match &mut self.kind {
            SessionKind::Server(session) if session.avatar_id().is_some() => {
                session.after_login.take()
            }
            _ => None,
        }
    }

    pub fn add_flash_message(&mut self, message: &str, domain: &str) {
        match &mut self.kind {
            SessionKind::Server(session) => session.add_flash_message(message, domain),
            SessionKind::Token(_) => debug!("dropping flash message for token session"),
        }
    }

    pub fn take_flash_messages(&mut self) -> Vec<FlashMessage> {
        match &mut self.kind {
            SessionKind::Server(session) => session.take_flash_messages(),
            SessionKind::Token(_) => Vec::new(),
        }
    }

    /// Write server sessions back to the store; token sessions are stateless.
    pub async fn save(&self, store: &dyn SessionStore) {
        if let SessionKind::Server(session) = &self.kind {
            store.put(session.clone()).await;
        }
    }

    /// `Set-Cookie` value when the client must learn a new session uid.
    ///
    /// # Errors
    /// Returns an error if the cookie value is not a valid header.
    pub fn cookie(&self, config: &AuthConfig) -> Result<Option<HeaderValue>, InvalidHeaderValue> {
        if !self.set_cookie {
            return Ok(None);
        }
        session_cookie(&config.cookie_name(), self.uid()).map(Some)
    }
}

/// Resolve the session cookie into the request session.
///
/// Token sessions are tried first (when enabled), then the store; anything
/// else starts a fresh server session.
///
/// # Errors
/// Returns an error if a new session uid cannot be generated.
pub async fn resolve(
    headers: &HeaderMap,
    config: &AuthConfig,
    store: &dyn SessionStore,
) -> Result<RequestSession> {
    if let Some(value) = extract_cookie(headers, &config.cookie_name()) {
        if config.jwt().session() {
            match verify_hs256(&value, config.jwt().secret(), now_unix_seconds()) {
                Ok(claims) => {
                    return Ok(RequestSession {
                        kind: SessionKind::Token(TokenSession::new(value, claims)),
                        set_cookie: false,
                    });
                }
                Err(err) => debug!("cookie is not a valid session token: {err}"),
            }
        }

        if let Some(session) = store.get(&value).await {
            return Ok(RequestSession::existing(session));
        }
    }

    Ok(RequestSession::fresh(Session::generate()?))
}

/// Build the session cookie, scoped to the whole site.
///
/// # Errors
/// Returns an error if `value` contains characters not allowed in a header.
pub fn session_cookie(name: &str, value: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax"))
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

/// Random, URL-safe session uid.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_uid() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session uid")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
