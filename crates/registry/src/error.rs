use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading reference data at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid service '{service}': {reason}")]
    InvalidService { service: String, reason: String },

    #[error("invalid registry snapshot: {reason}")]
    InvalidSnapshot { reason: String },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn invalid_service(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidService {
            service: service.into(),
            reason: reason.into(),
        }
    }
}
