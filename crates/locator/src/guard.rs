use std::path::{Path, PathBuf};

/// Canonical form of `candidate` when it is an existing regular file inside
/// `root` (after resolving `..` and symlinks on both sides); `None` otherwise.
pub fn contain(root: &Path, candidate: &Path) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let resolved = candidate.canonicalize().ok()?;
    if !resolved.starts_with(&root) {
        log::debug!(
            "Rejected {} (outside {})",
            resolved.display(),
            root.display()
        );
        return None;
    }
    resolved.is_file().then_some(resolved)
}

/// Whether `candidate` exists as a file but escapes `root`.
pub(crate) fn escapes(root: &Path, candidate: &Path) -> bool {
    let (Ok(root), Ok(resolved)) = (root.canonicalize(), candidate.canonicalize()) else {
        return false;
    };
    resolved.is_file() && !resolved.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn accepts_files_inside_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("sub");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/a.php"), "<?php").unwrap();

        let found = contain(&root, &root.join("src/../src/a.php")).unwrap();
        assert!(found.ends_with("src/a.php"));
        assert!(contain(&root, &root.join("src")).is_none(), "directories are not files");
        assert!(contain(&root, &root.join("missing.php")).is_none());
    }

    #[test]
    fn rejects_traversal_to_existing_sibling() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("sub");
        fs::create_dir_all(&root).unwrap();
        fs::write(temp.path().join("secret.txt"), "x").unwrap();

        let escape = root.join("../secret.txt");
        assert!(contain(&root, &escape).is_none());
        assert!(escapes(&root, &escape));
    }

    #[test]
    fn sibling_with_shared_name_prefix_is_outside() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("abc");
        let sibling = temp.path().join("abcdef");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("x.php"), "<?php").unwrap();

        assert!(contain(&root, &sibling.join("x.php")).is_none());
    }
}
