use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading configuration, palettes or maps.
///
/// These only occur at load time and are fatal to the caller: nothing is
/// retried and no partially loaded state is kept.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
    #[error("invalid map: {0}")]
    InvalidMap(String),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub(crate) fn read_to_string(path: &std::path::Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::io(path, source))
}
