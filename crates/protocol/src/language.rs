use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Source language of an analyzed submission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Php,
    Java,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown language tag: {0:?}")]
pub struct UnknownLanguage(pub String);

impl Language {
    pub const ALL: [Language; 2] = [Language::Php, Language::Java];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Php => "php",
            Language::Java => "java",
        }
    }

    /// Extension of source files the extractor reads for this language.
    pub fn source_extension(self) -> &'static str {
        match self {
            Language::Php => "php",
            Language::Java => "java",
        }
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "php" => Ok(Language::Php),
            "java" => Ok(Language::Java),
            _ => Err(UnknownLanguage(raw.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
