use super::{
    auth::LoginForm,
    handlers::{health, login, logout, session},
    session::FlashMessage,
};
use utoipa::{
    OpenApi,
    openapi::{Contact, InfoBuilder, License, Tag},
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, login::login, logout::logout, session::session),
    components(schemas(health::Health, LoginForm, session::SessionResponse, FlashMessage))
)]
pub struct ApiDoc;

/// Generated document with package metadata and tag descriptions.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Use Cargo.toml metadata instead of the utoipa crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Build and database status".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, logout and session state".to_string());

    doc.tags = Some(vec![health_tag, auth_tag]);

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(s: &str) -> Option<&str> {
        Some(s.trim()).filter(|s| !s.is_empty())
    }

    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
