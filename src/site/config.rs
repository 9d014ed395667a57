//! Login configuration: password checker, token sessions and cookie naming.

use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

use super::account::Account;

/// Secret used to sign tokens when none is configured.
///
/// Anyone who knows it can mint tokens; configure `--jwt-secret` in production.
pub const DEFAULT_JWT_SECRET: &str = "jwt_secret";

pub const DEFAULT_COOKIE_PREFIX: &str = "WARPSITE_SESSION";

/// Idle lifetime of a server session.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 15 * 60;

/// Lifetime of a signed session token.
pub const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Decides whether the submitted password matches the account.
pub type PasswordChecker = Arc<dyn Fn(&Account, &[u8]) -> bool + Send + Sync>;

/// Plaintext equality against the stored password.
///
/// Accounts store whatever the account tooling wrote; swap in a hashing
/// checker with [`AuthConfig::with_password_checker`] when passwords are hashed.
#[must_use]
pub fn default_check_password(account: &Account, password: &[u8]) -> bool {
    std::str::from_utf8(password).is_ok_and(|password| account.password == password)
}

#[derive(Clone, Default)]
pub struct JwtConfig {
    session: bool,
    secret: Option<SecretString>,
}

impl JwtConfig {
    #[must_use]
    pub fn new(session: bool, secret: Option<SecretString>) -> Self {
        let config = Self { session, secret };
        if config.session && !config.has_secret() {
            warn!("token sessions are signed with the built-in default secret, set --jwt-secret");
        }
        config
    }

    #[must_use]
    pub fn session(&self) -> bool {
        self.session
    }

    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret
            .as_ref()
            .is_some_and(|secret| !secret.expose_secret().is_empty())
    }

    /// Signing secret, falling back to [`DEFAULT_JWT_SECRET`].
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        match &self.secret {
            Some(secret) if !secret.expose_secret().is_empty() => {
                secret.expose_secret().as_bytes()
            }
            _ => {
                debug!("no jwt secret configured, using the built-in default");
                DEFAULT_JWT_SECRET.as_bytes()
            }
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("session", &self.session)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    check_password: PasswordChecker,
    jwt: JwtConfig,
    cookie_prefix: String,
    site_path: Vec<String>,
    session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            check_password: Arc::new(default_check_password),
            jwt: JwtConfig::default(),
            cookie_prefix: DEFAULT_COOKIE_PREFIX.to_string(),
            site_path: Vec::new(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_password_checker(mut self, checker: PasswordChecker) -> Self {
        self.check_password = checker;
        self
    }

    #[must_use]
    pub fn with_jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = jwt;
        self
    }

    #[must_use]
    pub fn with_cookie_prefix(mut self, prefix: String) -> Self {
        self.cookie_prefix = prefix;
        self
    }

    /// Path segments the site is mounted under, e.g. `"blog/admin"`.
    #[must_use]
    pub fn with_site_path(mut self, site_path: &str) -> Self {
        self.site_path = site_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(ToString::to_string)
            .collect();
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn password_checker(&self) -> &PasswordChecker {
        &self.check_password
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    /// Session cookie name: the prefix joined with the site path segments.
    #[must_use]
    pub fn cookie_name(&self) -> String {
        std::iter::once(self.cookie_prefix.as_str())
            .chain(self.site_path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt", &self.jwt)
            .field("cookie_prefix", &self.cookie_prefix)
            .field("site_path", &self.site_path)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(password: &str) -> Account {
        Account {
            id: 7,
            email: "alice@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn default_checker_compares_plaintext() {
        assert!(default_check_password(&account("s3cret"), b"s3cret"));
        assert!(!default_check_password(&account("s3cret"), b"S3cret"));
        assert!(!default_check_password(&account("s3cret"), &[0xff, 0xfe]));
    }

    #[test]
    fn cookie_name_joins_site_path() {
        let config = AuthConfig::new();
        assert_eq!(config.cookie_name(), "WARPSITE_SESSION");

        let config = AuthConfig::new().with_site_path("/blog/admin/");
        assert_eq!(config.cookie_name(), "WARPSITE_SESSION_blog_admin");

        let config = AuthConfig::new()
            .with_cookie_prefix("TWISTED_SESSION".to_string())
            .with_site_path("site");
        assert_eq!(config.cookie_name(), "TWISTED_SESSION_site");
    }

    #[test]
    fn jwt_secret_falls_back_to_default() {
        assert_eq!(JwtConfig::new(true, None).secret(), DEFAULT_JWT_SECRET.as_bytes());
        assert_eq!(
            JwtConfig::new(true, Some(SecretString::from(""))).secret(),
            DEFAULT_JWT_SECRET.as_bytes()
        );
        assert_eq!(
            JwtConfig::new(true, Some(SecretString::from("k3y"))).secret(),
            b"k3y"
        );
    }

    #[test]
    fn has_secret_ignores_empty_values() {
        assert!(!JwtConfig::new(true, None).has_secret());
        assert!(!JwtConfig::new(true, Some(SecretString::from(""))).has_secret());
        assert!(JwtConfig::new(true, Some(SecretString::from("k3y"))).has_secret());
    }

    #[test]
    fn debug_hides_secret() {
        let config =
            AuthConfig::new().with_jwt(JwtConfig::new(true, Some(SecretString::from("k3y"))));
        let printed = format!("{config:?}");
        assert!(!printed.contains("k3y"));
    }

    #[test]
    fn custom_checker_replaces_default() {
        let config = AuthConfig::new().with_password_checker(Arc::new(|_: &Account, _: &[u8]| true));
        assert!((config.password_checker())(&account("x"), &b"anything"[..]));
    }
}
