use crate::site::session::RequestSession;

/// Path segments left after the handler's mount point.
///
/// `"/login/extra/page"` mounted at `"/login"` yields `["extra", "page"]`.
#[must_use]
pub fn postpath<'a>(path: &'a str, mount: &str) -> Vec<&'a str> {
    match path.strip_prefix(mount) {
        Some("") | None => Vec::new(),
        Some(rest) => rest
            .strip_prefix('/')
            .map_or_else(Vec::new, |rest| rest.split('/').collect()),
    }
}

/// Where to send the client once the login or logout action has run.
///
/// An authenticated session's after-login target wins and is consumed;
/// otherwise the remaining path segments are rebuilt under `/`.
pub fn resolve(session: &mut RequestSession, postpath: &[&str]) -> String {
    session
        .take_after_login()
        .unwrap_or_else(|| format!("/{}", postpath.join("/")))
}
