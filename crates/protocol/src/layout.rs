use crate::Language;
use std::path::{Path, PathBuf};

/// Directory name of the upload root as it appears in analyzer paths.
pub const DEFAULT_PSEUDO_ROOT: &str = "uploads";
/// Per-submission directory holding decompiled Java sources.
pub const DEFAULT_DECOMPILED_DIR: &str = "decompiled";

/// Where submissions live on disk: `<storage_root>/<lang>/<hash>/...`.
///
/// Analyzers may run on another machine, so reported paths carry an arbitrary
/// absolute prefix in front of `<pseudo_root>/<lang>/<hash>/`. The layout
/// rewrites such paths into the repo-relative canonical form
/// `<pseudo_root>/<lang>/<hash>/<rest>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    storage_root: PathBuf,
    pseudo_root: String,
    decompiled_dir: String,
}

impl StorageLayout {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            pseudo_root: DEFAULT_PSEUDO_ROOT.to_string(),
            decompiled_dir: DEFAULT_DECOMPILED_DIR.to_string(),
        }
    }

    #[must_use]
    pub fn with_pseudo_root(mut self, name: impl Into<String>) -> Self {
        self.pseudo_root = trim_separators(&name.into()).to_string();
        self
    }

    #[must_use]
    pub fn with_decompiled_dir(mut self, name: impl Into<String>) -> Self {
        self.decompiled_dir = trim_separators(&name.into()).to_string();
        self
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn pseudo_root(&self) -> &str {
        &self.pseudo_root
    }

    pub fn decompiled_dir(&self) -> &str {
        &self.decompiled_dir
    }

    pub fn submission_root(&self, language: Language, hash: &str) -> PathBuf {
        self.storage_root.join(language.as_str()).join(hash)
    }

    pub fn decompiled_root(&self, language: Language, hash: &str) -> PathBuf {
        self.submission_root(language, hash)
            .join(&self.decompiled_dir)
    }

    /// Prefix of canonical repo-relative paths, e.g. `uploads/`.
    pub fn canonical_prefix(&self) -> String {
        format!("{}/", self.pseudo_root)
    }

    /// Rewrites `…/<pseudo_root>/<lang>/<hash>/<rest>` found anywhere in `raw`
    /// into `<pseudo_root>/<lang>/<hash>/<rest>`. Returns `raw` unchanged when
    /// no anchor is present.
    pub fn canonicalize_reported_path(&self, raw: &str) -> String {
        let normalized = raw.replace('\\', "/");
        let segments: Vec<&str> = normalized.split('/').collect();

        for i in 0..segments.len() {
            if i + 3 >= segments.len() {
                break;
            }
            if segments[i] != self.pseudo_root {
                continue;
            }
            let lang_matches = Language::ALL
                .iter()
                .any(|lang| lang.as_str() == segments[i + 1]);
            if !lang_matches || !is_content_hash(segments[i + 2]) {
                continue;
            }
            if segments[i + 3..].iter().all(|s| s.is_empty()) {
                continue;
            }
            return segments[i..].join("/");
        }

        raw.to_string()
    }
}

/// Content hashes are hex digests between 128 and 256 bits.
pub fn is_content_hash(candidate: &str) -> bool {
    (32..=64).contains(&candidate.len()) && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

fn trim_separators(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '/' || c == '\\')
}
