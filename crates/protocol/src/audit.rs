use crate::Language;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Header of an audit trail for one chain of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditMeta {
    /// Original filename of the submission
    pub project: String,
    pub language: Language,
    /// 1-based index of the selected chain (0 when the submission has none)
    pub chain_index: usize,
    pub chain_count: usize,
    pub chain_length: usize,
    pub entry: String,
    pub sink: String,
}

/// One chain step mapped back to source. Rebuilt on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditStep {
    /// 1-based step index
    pub index: usize,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_display_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_lines: Option<Vec<String>>,
}

impl AuditStep {
    /// Step that has a label but no usable location.
    pub fn unlocated(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            resolved_display_path: None,
            file_name: None,
            line: None,
            found: false,
            function_name: None,
            start_line: None,
            end_line: None,
            code_lines: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditContext {
    pub meta: AuditMeta,
    pub steps: Vec<AuditStep>,
}
