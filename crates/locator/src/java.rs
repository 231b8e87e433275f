use crate::guard::contain;
use crate::locator::{PathOrigin, Resolution, ResolvedPath, SourceLocator};
use crate::runtime_cache::RuntimeCache;
use crate::scanner::SourceScanner;
use async_trait::async_trait;
use gadget_protocol::{Language, StorageLayout};
use std::sync::Arc;

/// Finds decompiled Java sources: first in the submission's own decompiled
/// tree, then in the shared runtime cache.
pub struct JavaLocator {
    layout: StorageLayout,
    runtime: Option<Arc<RuntimeCache>>,
}

impl JavaLocator {
    pub fn new(layout: StorageLayout, runtime: Option<Arc<RuntimeCache>>) -> Self {
        Self { layout, runtime }
    }

    pub fn runtime(&self) -> Option<&Arc<RuntimeCache>> {
        self.runtime.as_ref()
    }

    fn search_submission(&self, hash: &str, needle: &str) -> Option<ResolvedPath> {
        let submission_root = self.layout.submission_root(Language::Java, hash);
        let tree = self.layout.decompiled_root(Language::Java, hash);
        let (path, relative) = SourceScanner::new(&tree)
            .with_extension("java")
            .find(needle)?;
        let absolute = contain(&submission_root, &path)?;
        Some(ResolvedPath {
            absolute,
            relative: format!("{}/{relative}", self.layout.decompiled_dir()),
            origin: PathOrigin::Submission,
        })
    }

    async fn search_runtime(&self, needle: &str) -> Option<ResolvedPath> {
        let runtime = self.runtime.as_ref()?;
        let root = match runtime.ensure_built().await {
            Ok(root) => root,
            Err(e) => {
                log::warn!("Runtime cache unavailable: {e}");
                return None;
            }
        };

        let scan_root = root.clone();
        let needle = needle.to_string();
        let (path, relative) = tokio::task::spawn_blocking(move || {
            SourceScanner::new(&scan_root)
                .with_extension("java")
                .find(&needle)
        })
        .await
        .ok()??;
        let absolute = contain(&root, &path)?;
        Some(ResolvedPath {
            absolute,
            relative,
            origin: PathOrigin::SharedRuntime,
        })
    }
}

#[async_trait]
impl SourceLocator for JavaLocator {
    fn language(&self) -> Language {
        Language::Java
    }

    async fn resolve(&self, hash: &str, raw_path: &str) -> Resolution {
        let Some(needle) = java_search_needle(raw_path, self.layout.decompiled_dir()) else {
            return Resolution::Unresolved;
        };

        if let Some(found) = self.search_submission(hash, &needle) {
            return Resolution::Found(found);
        }
        if let Some(found) = self.search_runtime(&needle).await {
            return Resolution::Found(found);
        }
        log::debug!("No decompiled source for {needle} (submission {hash})");
        Resolution::Unresolved
    }
}

/// Relative `.java` path to search for: `/`-separated, leading `./` and `/`
/// dropped, anything up to a `<decompiled>/` segment dropped, and the inner
/// class qualifier (`$…`) removed from the file name. Dotted class names
/// (`a.b.C$1`) become `a/b/C.java`.
pub fn java_search_needle(raw_path: &str, decompiled_dir: &str) -> Option<String> {
    let mut path = raw_path.trim().replace('\\', "/");
    if path.is_empty() {
        return None;
    }

    let marker = format!("/{decompiled_dir}/");
    if let Some(idx) = path.rfind(&marker) {
        path = path[idx + marker.len()..].to_string();
    } else if let Some(rest) = path.strip_prefix(&marker[1..]) {
        path = rest.to_string();
    }

    if !path.contains('/') && !path.ends_with(".java") {
        path = format!("{}.java", path.replace('.', "/"));
    }

    let path = path.trim_start_matches("./").trim_start_matches('/');
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let stem = file.strip_suffix(".java").unwrap_or(file);
    let outer = stem.split('$').next().unwrap_or(stem);
    if outer.is_empty() {
        return None;
    }

    Some(match dir {
        Some(dir) => format!("{dir}/{outer}.java"),
        None => format!("{outer}.java"),
    })
}
