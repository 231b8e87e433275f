use thiserror::Error;

/// Why a single raw analyzer record was dropped.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),
}

impl RecordError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::UnexpectedShape(msg.into())
    }
}
