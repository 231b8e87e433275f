use crate::java::JavaFormat;
use crate::php::PhpFormat;
use gadget_protocol::{FilePosition, Language, StorageLayout};
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[&\s]*([\p{L}_$][\w$]*)").expect("valid regex"));

static FIRST_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_\\][\w\\]*").expect("valid regex"));

/// One step of a parsed record, before canonical ids and roles are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStep {
    pub label: String,
    /// Short name supplied by the analyzer, if any
    pub short: Option<String>,
    pub position: Option<FilePosition>,
}

impl RawStep {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            short: None,
            position: None,
        }
    }
}

/// A record that parsed successfully; may still be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawChain {
    pub steps: Vec<RawStep>,
    /// `edge_labels[i]` annotates the edge `steps[i] -> steps[i + 1]`
    pub edge_labels: Vec<Option<String>>,
}

/// Per-language analyzer format.
pub trait ChainFormat: Send + Sync {
    fn language(&self) -> Language;

    /// Parses a whole raw blob. Malformed records are skipped, never fatal.
    fn records(&self, raw: &str, layout: &StorageLayout) -> Vec<RawChain>;

    /// Derives the short display name of a full signature.
    fn short_label(&self, label: &str) -> String;
}

pub fn format_for(language: Language) -> &'static dyn ChainFormat {
    static PHP: PhpFormat = PhpFormat;
    static JAVA: JavaFormat = JavaFormat;
    match language {
        Language::Php => &PHP,
        Language::Java => &JAVA,
    }
}

/// Text after the last `#` or `::` member separator.
pub(crate) fn after_member_separator(label: &str) -> Option<&str> {
    let hash = label.rfind('#').map(|i| i + 1);
    let colons = label.rfind("::").map(|i| i + 2);
    let start = hash.max(colons)?;
    let tail = label[start..].trim();
    (!tail.is_empty()).then_some(tail)
}

/// Identifier at the start of `text` (ignoring a by-ref `&`).
pub(crate) fn leading_identifier(text: &str) -> Option<&str> {
    LEADING_IDENT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// First identifier-like token anywhere in `text`.
pub(crate) fn first_identifier(text: &str) -> Option<&str> {
    FIRST_IDENT.find(text).map(|m| m.as_str())
}
