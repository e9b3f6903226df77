use std::time::Duration;

use crate::error::{CatalogError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_BUSY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_COMMENT_LIMIT: usize = 100;

/// Settings shared by the data access layer and the review form.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Base URL of the movie API, without a trailing slash.
    pub base_url: String,
    /// Pause inserted before every request so busy indicators stay visible.
    pub busy_delay: Duration,
    /// Upper bound for review comments, in characters.
    pub comment_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            busy_delay: DEFAULT_BUSY_DELAY,
            comment_limit: DEFAULT_COMMENT_LIMIT,
        }
    }
}

impl ServiceConfig {
    /// Build a config from `MOVIE_API_URL`, `MOVIE_BUSY_DELAY_MS` and
    /// `REVIEW_COMMENT_LIMIT`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MOVIE_API_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(raw) = std::env::var("MOVIE_BUSY_DELAY_MS") {
            let millis = raw.trim().parse::<u64>().map_err(|_| {
                CatalogError::Config(format!("MOVIE_BUSY_DELAY_MS must be an integer, got {raw:?}"))
            })?;
            config.busy_delay = Duration::from_millis(millis);
        }
        if let Ok(raw) = std::env::var("REVIEW_COMMENT_LIMIT") {
            let limit = raw.trim().parse::<usize>().map_err(|_| {
                CatalogError::Config(format!("REVIEW_COMMENT_LIMIT must be an integer, got {raw:?}"))
            })?;
            config = config.with_comment_limit(limit)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_busy_delay(mut self, busy_delay: Duration) -> Self {
        self.busy_delay = busy_delay;
        self
    }

    /// A limit of zero would make every comment invalid, so it is refused.
    pub fn with_comment_limit(mut self, comment_limit: usize) -> Result<Self> {
        if comment_limit == 0 {
            return Err(CatalogError::Config(
                "comment limit must be greater than zero".to_string(),
            ));
        }
        self.comment_limit = comment_limit;
        Ok(self)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
