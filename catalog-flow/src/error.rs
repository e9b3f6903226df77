use thiserror::Error;

/// Client-side validation failures. These never reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Score is not valid.")]
    InvalidScore,

    #[error("The comment should not exceed {limit} chars (got {length}).")]
    CommentTooLong { limit: usize, length: usize },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Transport failure: connection refused, DNS, TLS, timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A review for this form is still being submitted.
    #[error("A review submission is already in progress")]
    InProgress,
}

impl CatalogError {
    /// True for every failure that happened on the wire (or while reading
    /// what came back), as opposed to input rejected locally.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            CatalogError::Network(_) | CatalogError::Api { .. } | CatalogError::Decode(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
