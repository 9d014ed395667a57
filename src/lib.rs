//! # Warpsite (site management and login scaffolding)
//!
//! `warpsite` bundles the pieces a small content-managed site needs around its
//! pages: a command dispatcher for site-management tasks, a database session
//! factory, and the login/logout request handlers.
//!
//! ## Sessions
//!
//! Every client gets a cookie-backed server session on first contact. A
//! session carries at most one account id, an optional "after login" redirect
//! target and one-time flash messages.
//!
//! When token sessions are enabled (`--jwt-session`), a successful login
//! replaces the server session with a stateless HS256 token stored in the
//! same cookie. Tokens expire after 24 hours and cannot be revoked.
//!
//! > **Warning:** without `--jwt-secret`, tokens are signed with the literal
//! > secret `jwt_secret`. The default password checker compares plaintext.
//!
//! ## Login failures
//!
//! Unknown accounts and wrong passwords produce the same flash message so the
//! login form never reveals whether an email is registered.

pub mod cli;
pub mod db;
pub mod site;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
