use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL '{url}': {reason}")]
    Validation { url: String, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch {url}: status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("search index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A command line that could not be parsed, already rendered for display.
    #[error("{0}")]
    Usage(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    pub(crate) fn bookmark_not_found(id: i64) -> Self {
        Self::NotFound {
            kind: "bookmark",
            name: id.to_string(),
        }
    }

    /// Whether this error came from fetching a page rather than from local
    /// state.
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Http(_) | Self::HttpStatus { .. })
    }
}
