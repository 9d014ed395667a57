use std::{fmt, sync::Arc};

use super::{account::AccountStore, config::AuthConfig, session::SessionStore};

/// Everything the site handlers share.
#[derive(Clone)]
pub struct SiteState {
    config: AuthConfig,
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
}

impl SiteState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            accounts,
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}

impl fmt::Debug for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
