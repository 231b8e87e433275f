use crate::{LocatorError, Result};
use fs2::FileExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::time::timeout;

const COMPLETE_MARKER: &str = ".complete";

/// External decompiler invocation. `{input}` and `{output}` in `args` are
/// replaced with the runtime archive and the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompilerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DecompilerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expanded_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeCacheConfig {
    /// Runtime class archive to decompile (e.g. `rt.jar`)
    pub archive: PathBuf,
    /// Directory the decompiled tree is published to
    pub cache_dir: PathBuf,
    pub decompiler: DecompilerCommand,
    pub timeout: Duration,
}

/// Shared decompiled tree of the language runtime. Built at most once per
/// process, guarded by an exclusive lock file across processes, and
/// published with a single rename so readers never see a partial tree.
pub struct RuntimeCache {
    config: RuntimeCacheConfig,
    built: OnceCell<PathBuf>,
}

impl RuntimeCache {
    pub fn new(config: RuntimeCacheConfig) -> Self {
        Self {
            config,
            built: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.cache_dir
    }

    pub fn is_built(&self) -> bool {
        self.config.cache_dir.join(COMPLETE_MARKER).is_file()
    }

    /// Root of the published tree, building it first if needed. A failed
    /// build leaves nothing behind and is retried by the next caller.
    pub async fn ensure_built(&self) -> Result<PathBuf> {
        self.built
            .get_or_try_init(|| self.build_once())
            .await
            .cloned()
    }

    async fn build_once(&self) -> Result<PathBuf> {
        let cache_dir = self.config.cache_dir.clone();
        if self.is_built() {
            return Ok(cache_dir);
        }

        let _lock = acquire_cache_build_lock(&cache_dir).await?;
        // Another process may have finished while we waited.
        if self.is_built() {
            return Ok(cache_dir);
        }

        if !self.config.archive.is_file() {
            return Err(LocatorError::CacheBuild(format!(
                "runtime archive {} not found",
                self.config.archive.display()
            )));
        }

        let parent = cache_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent).await?;
        let staging = tempfile::Builder::new()
            .prefix(".runtime-build-")
            .tempdir_in(&parent)?;

        log::info!(
            "Decompiling {} into {}",
            self.config.archive.display(),
            cache_dir.display()
        );
        let start = Instant::now();
        self.run_decompiler(staging.path()).await?;
        tokio::fs::write(staging.path().join(COMPLETE_MARKER), b"").await?;

        if cache_dir.exists() {
            log::warn!("Replacing incomplete runtime cache {}", cache_dir.display());
            tokio::fs::remove_dir_all(&cache_dir).await?;
        }
        tokio::fs::rename(staging.path(), &cache_dir).await?;
        log::info!(
            "Runtime cache ready in {}ms",
            start.elapsed().as_millis()
        );

        Ok(cache_dir)
    }

    async fn run_decompiler(&self, output: &Path) -> Result<()> {
        let decompiler = &self.config.decompiler;
        let args = decompiler.expanded_args(&self.config.archive, output);
        let child = tokio::process::Command::new(&decompiler.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = timeout(self.config.timeout, child)
            .await
            .map_err(|_| LocatorError::DecompilerTimeout(self.config.timeout.as_secs()))?
            .map_err(|err| {
                LocatorError::CacheBuild(format!("spawn {}: {err}", decompiler.program))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(LocatorError::CacheBuild(format!(
                "{} exited with {}: {}",
                decompiler.program,
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

struct CacheBuildLock {
    file: std::fs::File,
}

impl Drop for CacheBuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path_for_cache(cache_dir: &Path) -> PathBuf {
    let mut name = cache_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "runtime".into());
    name.push(".lock");
    cache_dir.with_file_name(name)
}

async fn acquire_cache_build_lock(cache_dir: &Path) -> Result<CacheBuildLock> {
    let path = lock_path_for_cache(cache_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || -> Result<CacheBuildLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                LocatorError::Other(format!("open cache lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            LocatorError::Other(format!("acquire cache lock {}: {err}", path.display()))
        })?;
        log::debug!(
            "Acquired {} after {}ms",
            path.display(),
            start.elapsed().as_millis()
        );

        Ok(CacheBuildLock { file })
    })
    .await
    .map_err(|err| LocatorError::Other(format!("join cache lock task: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn placeholders_expand() {
        let cmd = DecompilerCommand::new(
            "java",
            vec![
                "-jar".into(),
                "cfr.jar".into(),
                "{input}".into(),
                "--outputdir".into(),
                "{output}".into(),
            ],
        );
        let args = cmd.expanded_args(Path::new("/jdk/rt.jar"), Path::new("/cache/rt"));
        assert_eq!(args, vec!["-jar", "cfr.jar", "/jdk/rt.jar", "--outputdir", "/cache/rt"]);
    }

    #[test]
    fn lock_sits_next_to_cache() {
        assert_eq!(
            lock_path_for_cache(Path::new("/var/cache/runtime")),
            PathBuf::from("/var/cache/runtime.lock")
        );
    }
}
