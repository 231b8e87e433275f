use gadget_locator::{
    DecompilerCommand, Locators, PathOrigin, RuntimeCache, RuntimeCacheConfig, SourceLocator,
};
use gadget_protocol::{Language, StorageLayout};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// Shell "decompiler" that writes one class and appends to a run counter.
fn fake_decompiler(counter: &Path) -> DecompilerCommand {
    let script = format!(
        "echo run >> '{}' && mkdir -p \"$2/java/util\" && \
         printf 'package java.util;\\npublic class HashMap {{\\n    public int hashCode() {{\\n        return 0;\\n    }}\\n}}\\n' \
         > \"$2/java/util/HashMap.java\"",
        counter.display()
    );
    DecompilerCommand::new(
        "sh",
        vec![
            "-c".into(),
            script,
            "decompile".into(),
            "{input}".into(),
            "{output}".into(),
        ],
    )
}

fn runtime_config(root: &Path, decompiler: DecompilerCommand) -> RuntimeCacheConfig {
    let archive = root.join("rt.jar");
    fs::write(&archive, b"PK").unwrap();
    RuntimeCacheConfig {
        archive,
        cache_dir: root.join("cache/runtime"),
        decompiler,
        timeout: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn php_rejects_paths_outside_the_submission() {
    let temp = tempdir().unwrap();
    let layout = StorageLayout::new(temp.path().join("uploads"));
    for hash in [HASH_A, HASH_B] {
        let root = layout.submission_root(Language::Php, hash);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.php"), "<?php\n").unwrap();
    }
    fs::write(temp.path().join("outside.php"), "<?php\n").unwrap();

    let locators = Locators::new(layout, None);
    let php = locators.for_language(Language::Php);

    assert!(php.locate(HASH_A, "index.php").await.is_some());

    // Another submission's file, addressed in canonical form.
    let spoofed = format!("uploads/php/{HASH_B}/index.php");
    assert!(php.locate(HASH_A, &spoofed).await.is_none());

    // Traversal out of the storage tree.
    assert!(php.locate(HASH_A, "../../../outside.php").await.is_none());
    let absolute = temp.path().join("outside.php");
    assert!(php.locate(HASH_A, &absolute.to_string_lossy()).await.is_none());
}

#[tokio::test]
async fn java_falls_back_to_runtime_cache() {
    let temp = tempdir().unwrap();
    let counter = temp.path().join("runs.log");
    let cache = Arc::new(RuntimeCache::new(runtime_config(
        temp.path(),
        fake_decompiler(&counter),
    )));
    let layout = StorageLayout::new(temp.path().join("uploads"));
    fs::create_dir_all(layout.decompiled_root(Language::Java, HASH_A)).unwrap();

    let locators = Locators::new(layout, Some(cache.clone()));
    let java = locators.for_language(Language::Java);
    let found = java
        .locate(HASH_A, "java/util/HashMap.java")
        .await
        .expect("runtime class");
    assert_eq!(found.origin, PathOrigin::SharedRuntime);
    assert_eq!(found.relative, "java/util/HashMap.java");
    assert!(cache.is_built());
}

#[tokio::test]
async fn runtime_cache_builds_once() {
    let temp = tempdir().unwrap();
    let counter = temp.path().join("runs.log");
    let config = runtime_config(temp.path(), fake_decompiler(&counter));
    let cache = Arc::new(RuntimeCache::new(config.clone()));

    let (a, b) = tokio::join!(cache.ensure_built(), cache.ensure_built());
    assert_eq!(a.unwrap(), b.unwrap());

    // A second instance (another process) reuses the published tree.
    let other = RuntimeCache::new(config);
    other.ensure_built().await.unwrap();

    let runs = fs::read_to_string(&counter).unwrap();
    assert_eq!(runs.lines().count(), 1);
}

#[tokio::test]
async fn failed_build_publishes_nothing() {
    let temp = tempdir().unwrap();
    let failing = DecompilerCommand::new("sh", vec!["-c".into(), "exit 3".into()]);
    let cache = RuntimeCache::new(runtime_config(temp.path(), failing));

    assert!(cache.ensure_built().await.is_err());
    assert!(!cache.is_built());
    assert!(!cache.root().exists());
}

#[tokio::test]
async fn slow_decompiler_times_out() {
    let temp = tempdir().unwrap();
    let slow = DecompilerCommand::new("sh", vec!["-c".into(), "sleep 5".into()]);
    let mut config = runtime_config(temp.path(), slow);
    config.timeout = Duration::from_millis(200);
    let cache = RuntimeCache::new(config);

    assert!(matches!(
        cache.ensure_built().await,
        Err(gadget_locator::LocatorError::DecompilerTimeout(_))
    ));
    assert!(!cache.root().exists());
}
