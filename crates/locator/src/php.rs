use crate::guard::{contain, escapes};
use crate::locator::{PathOrigin, Resolution, ResolvedPath, SourceLocator};
use async_trait::async_trait;
use gadget_protocol::{Language, StorageLayout};
use std::path::{Path, PathBuf};

/// Resolves PHP paths reported by the analyzer against the uploaded tree.
///
/// Candidates, in order:
/// 1. absolute path containing `/<hash>/` that exists
/// 2. canonical `uploads/<lang>/<hash>/…` joined onto the storage root
/// 3. text after a `/<hash>/` anchor joined onto the submission root
/// 4. the raw path relative to the submission root
///
/// Every candidate must canonicalize inside the submission root.
#[derive(Debug, Clone)]
pub struct PhpLocator {
    layout: StorageLayout,
}

impl PhpLocator {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn resolve_in(&self, submission_root: &Path, hash: &str, raw_path: &str) -> Resolution {
        let raw = raw_path.trim();
        if raw.is_empty() || hash.is_empty() {
            return Resolution::Unresolved;
        }
        let normalized = raw.replace('\\', "/");
        let anchor = format!("/{hash}/");

        let mut candidates: Vec<PathBuf> = Vec::with_capacity(4);
        if Path::new(raw).is_absolute() && normalized.contains(&anchor) {
            candidates.push(PathBuf::from(raw));
        }
        if let Some(rest) = normalized.strip_prefix(&self.layout.canonical_prefix()) {
            candidates.push(self.layout.storage_root().join(rest));
        }
        if let Some(idx) = normalized.rfind(&anchor) {
            let rest = &normalized[idx + anchor.len()..];
            if !rest.is_empty() {
                candidates.push(submission_root.join(rest));
            }
        }
        candidates.push(submission_root.join(normalized.trim_start_matches("./")));

        let mut rejected = false;
        for candidate in candidates {
            if let Some(absolute) = contain(submission_root, &candidate) {
                let relative = relative_display(submission_root, &absolute);
                return Resolution::Found(ResolvedPath {
                    absolute,
                    relative,
                    origin: PathOrigin::Submission,
                });
            }
            if escapes(submission_root, &candidate) {
                log::warn!("Refusing {raw} for submission {hash}: resolves outside its root");
                rejected = true;
            }
        }

        if rejected {
            Resolution::Rejected
        } else {
            log::debug!("Could not resolve {raw} for submission {hash}");
            Resolution::Unresolved
        }
    }
}

#[async_trait]
impl SourceLocator for PhpLocator {
    fn language(&self) -> Language {
        Language::Php
    }

    async fn resolve(&self, hash: &str, raw_path: &str) -> Resolution {
        let root = self.layout.submission_root(Language::Php, hash);
        self.resolve_in(&root, hash, raw_path)
    }
}

pub(crate) fn relative_display(root: &Path, absolute: &Path) -> String {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    absolute
        .strip_prefix(&root)
        .unwrap_or(absolute)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    fn setup() -> (tempfile::TempDir, PhpLocator, PathBuf) {
        let temp = tempdir().unwrap();
        let layout = StorageLayout::new(temp.path());
        let root = layout.submission_root(Language::Php, HASH);
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/a.php"), "<?php\n").unwrap();
        (temp, PhpLocator::new(layout), root)
    }

    fn relative(resolution: Resolution) -> Option<String> {
        resolution.found().map(|p| p.relative)
    }

    #[test]
    fn absolute_path_inside_root() {
        let (_temp, locator, root) = setup();
        let raw = root.join("src/a.php");
        let found = locator.resolve_in(&root, HASH, &raw.to_string_lossy());
        assert_eq!(relative(found), Some("src/a.php".to_string()));
    }

    #[test]
    fn canonical_form_and_anchor() {
        let (_temp, locator, root) = setup();
        let canonical = format!("uploads/php/{HASH}/src/a.php");
        assert_eq!(
            relative(locator.resolve_in(&root, HASH, &canonical)),
            Some("src/a.php".to_string())
        );

        let foreign = format!("/var/www/elsewhere/{HASH}/src/a.php");
        assert_eq!(
            relative(locator.resolve_in(&root, HASH, &foreign)),
            Some("src/a.php".to_string())
        );

        let windows = format!("C:\\build\\{HASH}\\src\\a.php");
        assert_eq!(
            relative(locator.resolve_in(&root, HASH, &windows)),
            Some("src/a.php".to_string())
        );
    }

    #[test]
    fn relative_path() {
        let (_temp, locator, root) = setup();
        assert_eq!(
            relative(locator.resolve_in(&root, HASH, "./src/a.php")),
            Some("src/a.php".to_string())
        );
        assert_eq!(locator.resolve_in(&root, HASH, "src/b.php"), Resolution::Unresolved);
        assert_eq!(locator.resolve_in(&root, HASH, ""), Resolution::Unresolved);
    }

    #[test]
    fn traversal_is_rejected() {
        let (temp, locator, root) = setup();
        fs::write(temp.path().join("secret.php"), "<?php").unwrap();
        assert_eq!(
            locator.resolve_in(&root, HASH, "../../secret.php"),
            Resolution::Rejected
        );
    }
}
