use clap::{Arg, ArgAction, Command};

use crate::site::config::DEFAULT_COOKIE_PREFIX;

pub const ARG_PORT: &str = "port";
pub const ARG_JWT_SESSION: &str = "jwt-session";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";
pub const ARG_COOKIE_PREFIX: &str = "cookie-prefix";
pub const ARG_SITE_PATH: &str = "site-path";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("WARPSITE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_JWT_SESSION)
                .long("jwt-session")
                .help("Replace the server session with a signed token after login")
                .env("WARPSITE_JWT_SESSION")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long("jwt-secret")
                .help("Secret used to sign session tokens")
                .long_help(
                    "Secret used to sign session tokens. Without it tokens are signed with a \
                     well-known default and anyone can forge them.",
                )
                .env("WARPSITE_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long("session-ttl-seconds")
                .help("Idle lifetime of server sessions (default: 900)")
                .env("WARPSITE_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_PREFIX)
                .long("cookie-prefix")
                .help("Session cookie name prefix")
                .default_value(DEFAULT_COOKIE_PREFIX)
                .env("WARPSITE_COOKIE_PREFIX"),
        )
        .arg(
            Arg::new(ARG_SITE_PATH)
                .long("site-path")
                .help("Path the site is mounted under, appended to the cookie name")
                .env("WARPSITE_SITE_PATH"),
        )
}
