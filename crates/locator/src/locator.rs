use crate::java::JavaLocator;
use crate::php::PhpLocator;
use crate::runtime_cache::RuntimeCache;
use async_trait::async_trait;
use gadget_protocol::{Language, StorageLayout};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Which tree a resolved file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOrigin {
    Submission,
    SharedRuntime,
}

/// A file the analyzer location was mapped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// Canonical absolute path on disk
    pub absolute: PathBuf,
    /// `/`-separated path relative to the tree it was found in
    pub relative: String,
    pub origin: PathOrigin,
}

impl ResolvedPath {
    pub fn file_name(&self) -> Option<String> {
        self.absolute
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Outcome of one lookup. `Rejected` means a candidate existed but escaped
/// the submission root; callers treat it the same as `Unresolved`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedPath),
    Unresolved,
    Rejected,
}

impl Resolution {
    pub fn found(self) -> Option<ResolvedPath> {
        match self {
            Resolution::Found(path) => Some(path),
            Resolution::Unresolved | Resolution::Rejected => None,
        }
    }
}

#[async_trait]
pub trait SourceLocator: Send + Sync {
    fn language(&self) -> Language;

    /// Map an analyzer-reported path of submission `hash` to a real file.
    async fn resolve(&self, hash: &str, raw_path: &str) -> Resolution;

    async fn locate(&self, hash: &str, raw_path: &str) -> Option<ResolvedPath> {
        self.resolve(hash, raw_path).await.found()
    }
}

/// One locator per supported language, sharing the storage layout.
pub struct Locators {
    php: PhpLocator,
    java: JavaLocator,
}

impl Locators {
    pub fn new(layout: StorageLayout, runtime: Option<Arc<RuntimeCache>>) -> Self {
        Self {
            php: PhpLocator::new(layout.clone()),
            java: JavaLocator::new(layout, runtime),
        }
    }

    pub fn for_language(&self, language: Language) -> &dyn SourceLocator {
        match language {
            Language::Php => &self.php,
            Language::Java => &self.java,
        }
    }
}
