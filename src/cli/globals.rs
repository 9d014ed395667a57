use std::path::{Path, PathBuf};

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub site_dir: PathBuf,
    pub skip_schema_check: bool,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(site_dir: PathBuf) -> Self {
        Self {
            site_dir,
            skip_schema_check: false,
        }
    }

    #[must_use]
    pub fn with_skip_schema_check(mut self, skip: bool) -> Self {
        self.skip_schema_check = skip;
        self
    }

    /// Directory holding the site's SQL migrations.
    #[must_use]
    pub fn migrations_dir(&self) -> PathBuf {
        self.site_dir.join("migrations")
    }

    #[must_use]
    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }
}
