//! The login decision flow.
//!
//! A login request goes through [`verify`] (credentials against the account
//! store), then [`issue`] (server identity or signed token), and always ends
//! with [`redirect::resolve`]. Logout skips straight to clearing the identity
//! and resolving the redirect.

pub mod issue;
pub mod redirect;
pub mod verify;

pub use issue::{SessionOutcome, issue};
pub use verify::{LoginFailure, LoginForm, verify};
