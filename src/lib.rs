use std::path::PathBuf;

pub mod config;
pub mod document;
pub mod export;
pub mod gauge;
pub mod geometry;
pub mod procure;
pub mod progress;
pub mod publish;
pub mod reach;
pub mod schema;
pub mod text;
pub mod warning;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
#[error("{context}: {detail}")]
pub struct Error {
    pub context: Box<ErrorContext>,
    pub detail: Box<ErrorDetail>,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub path: PathBuf,
    pub reach_id: Option<i64>,
}

impl ErrorContext {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            reach_id: None,
        }
    }

    pub fn with_reach_id(&self, reach_id: i64) -> Self {
        Self {
            path: self.path.clone(),
            reach_id: Some(reach_id),
        }
    }

    pub fn error(&self, detail: impl Into<ErrorDetail>) -> Error {
        Error {
            context: Box::new(self.clone()),
            detail: Box::new(detail.into()),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reach_id {
            Some(id) => write!(f, "reach {id}({})", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorDetail {
    #[error("failed to read document: {0}")]
    ReadDocument(std::io::Error),
    #[error("failed to parse JSON document: {0}")]
    ParseJson(serde_json::Error),
    #[error(transparent)]
    Malformed(#[from] document::MalformedSourceDocument),
    #[error(transparent)]
    SpatialReference(#[from] geometry::UnsupportedSpatialReference),
    #[error(transparent)]
    Schema(#[from] schema::SchemaInconsistency),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not download reach {reach_id} after {attempts} attempts")]
    Download { reach_id: u64, attempts: usize },
    #[error("feature service rejected the request: {0}")]
    Service(String),
}

impl ErrorDetail {
    /// Whether the orchestration layer may skip the offending document and
    /// continue with the rest of the batch.
    pub fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Self::ReadDocument(_)
                | Self::ParseJson(_)
                | Self::Malformed(_)
                | Self::SpatialReference(_)
        )
    }
}
