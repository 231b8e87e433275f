use crate::Language;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Finished,
    /// External analyzer failed or timed out; terminal.
    Failed,
}

impl SubmissionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

/// One uploaded artifact, keyed by content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Submission {
    pub hash: String,
    pub filename: String,
    pub language: Language,
    pub status: SubmissionStatus,
    /// Raw analyzer output, present once `status == finished`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub created_unix_ms: u64,
}

impl Submission {
    pub fn pending(
        hash: impl Into<String>,
        filename: impl Into<String>,
        language: Language,
        created_unix_ms: u64,
    ) -> Self {
        Self {
            hash: hash.into(),
            filename: filename.into(),
            language,
            status: SubmissionStatus::Pending,
            result: None,
            failure_reason: None,
            created_unix_ms,
        }
    }
}
