use gadget_protocol::SubmissionStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    #[error("Unknown submission: {0}")]
    UnknownSubmission(String),

    #[error("Submission {hash} is {status:?}, not finished")]
    NotFinished {
        hash: String,
        status: SubmissionStatus,
    },

    #[error("Submission {hash} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        hash: String,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("Submission {0} already registered with different metadata")]
    Conflict(String),

    #[error("Analyzer failed: {0}")]
    AnalyzerFailed(String),

    #[error("{0}")]
    Other(String),
}
