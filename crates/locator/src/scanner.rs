use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MAX_WALK_DEPTH: usize = 64;
const MAX_WALK_ENTRIES: usize = 500_000;

/// Deterministic walk over one tree, looking for a source file whose
/// `/`-separated relative path contains a needle on a segment boundary.
pub struct SourceScanner {
    root: PathBuf,
    extension: Option<String>,
}

impl SourceScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: None,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.trim_start_matches('.').to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First match in file-name order, as (absolute path, relative path).
    /// Symlinks are not followed, so results never leave the tree.
    pub fn find(&self, needle: &str) -> Option<(PathBuf, String)> {
        if needle.is_empty() || !self.root.is_dir() {
            return None;
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .max_depth(MAX_WALK_DEPTH)
            .sort_by_file_name();

        for (visited, entry) in walker.into_iter().enumerate() {
            if visited >= MAX_WALK_ENTRIES {
                log::warn!(
                    "Stopped scanning {} after {MAX_WALK_ENTRIES} entries",
                    self.root.display()
                );
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = &self.extension {
                if entry.path().extension().and_then(|e| e.to_str()) != Some(ext.as_str()) {
                    continue;
                }
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if contains_on_boundary(&relative, needle) {
                return Some((entry.path().to_path_buf(), relative));
            }
        }
        None
    }
}

/// `needle` occurs in `haystack` starting at the beginning or right after a `/`.
fn contains_on_boundary(haystack: &str, needle: &str) -> bool {
    haystack
        .match_indices(needle)
        .any(|(idx, _)| idx == 0 || haystack[..idx].ends_with('/'))
}
