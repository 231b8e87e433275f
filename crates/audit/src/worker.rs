use crate::config::AnalyzerCommands;
use crate::store::SubmissionStore;
use crate::{AuditError, Result};
use async_trait::async_trait;
use gadget_protocol::{Language, StorageLayout, Submission};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Produces the raw analyzer output for one submission.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, submission: &Submission, submission_root: &Path) -> Result<String>;
}

/// Runs the configured external analyzer. `{input}` is the submission root
/// and `{output}` the file the analyzer writes; stdout is used when that file
/// is missing.
pub struct CommandAnalyzer {
    commands: AnalyzerCommands,
    timeout: Duration,
}

impl CommandAnalyzer {
    pub fn new(commands: AnalyzerCommands, timeout: Duration) -> Self {
        Self { commands, timeout }
    }

    fn output_path(submission_root: &Path, language: Language) -> PathBuf {
        submission_root.join(format!(".{language}-chains.out"))
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    async fn analyze(&self, submission: &Submission, submission_root: &Path) -> Result<String> {
        let language = submission.language;
        let command = self.commands.for_language(language).ok_or_else(|| {
            AuditError::AnalyzerFailed(format!("no analyzer configured for {language}"))
        })?;

        let output_path = Self::output_path(submission_root, language);
        let args = command.expanded_args(submission_root, &output_path);
        log::debug!("Running {} {:?} for {}", command.program, args, submission.hash);

        let child = tokio::process::Command::new(&command.program)
            .args(&args)
            .current_dir(submission_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, child)
            .await
            .map_err(|_| {
                AuditError::AnalyzerFailed(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| AuditError::AnalyzerFailed(format!("spawn {}: {err}", command.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuditError::AnalyzerFailed(format!(
                "{} exited with {}: {}",
                command.program,
                output.status,
                stderr.trim()
            )));
        }

        match tokio::fs::read(&output_path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Finished(String),
    Failed(String),
}

/// Sent by workers; only the applier touches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub hash: String,
    pub outcome: AnalysisOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub finished: usize,
    pub failed: usize,
    /// Updates the store refused (e.g. record no longer pending)
    pub rejected: usize,
}

/// Runs submissions through an [`Analyzer`] with a fixed number in flight.
pub struct AnalysisPool {
    analyzer: Arc<dyn Analyzer>,
    layout: StorageLayout,
    limit: usize,
}

impl AnalysisPool {
    pub fn new(analyzer: Arc<dyn Analyzer>, layout: StorageLayout, limit: usize) -> Self {
        Self {
            analyzer,
            layout,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Analyzes `submissions` and waits until every status update is applied.
    pub async fn run(&self, store: &SubmissionStore, submissions: Vec<Submission>) -> PoolReport {
        let (tx, rx) = mpsc::channel::<StatusUpdate>(self.limit * 2);
        let applier = tokio::spawn(apply_updates(store.clone(), rx));

        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut workers = JoinSet::new();
        log::info!(
            "Analyzing {} submission(s), at most {} at a time",
            submissions.len(),
            self.limit
        );

        for submission in submissions {
            let semaphore = semaphore.clone();
            let analyzer = self.analyzer.clone();
            let tx = tx.clone();
            let root = self.layout.submission_root(submission.language, &submission.hash);

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = match analyzer.analyze(&submission, &root).await {
                    Ok(raw) => AnalysisOutcome::Finished(raw),
                    Err(e) => AnalysisOutcome::Failed(e.to_string()),
                };
                let update = StatusUpdate {
                    hash: submission.hash,
                    outcome,
                };
                if tx.send(update).await.is_err() {
                    log::warn!("Status applier stopped before all updates were sent");
                }
            });
        }
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::warn!("Analysis worker panicked: {e}");
            }
        }

        match applier.await {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Status applier failed: {e}");
                PoolReport::default()
            }
        }
    }
}

async fn apply_updates(store: SubmissionStore, mut rx: mpsc::Receiver<StatusUpdate>) -> PoolReport {
    let mut report = PoolReport::default();
    while let Some(update) = rx.recv().await {
        let applied = match update.outcome {
            AnalysisOutcome::Finished(raw) => store.finish(&update.hash, raw).await.map(|_| true),
            AnalysisOutcome::Failed(reason) => store.fail(&update.hash, &reason).await.map(|_| false),
        };
        match applied {
            Ok(true) => report.finished += 1,
            Ok(false) => report.failed += 1,
            Err(e) => {
                log::warn!("Could not apply status for {}: {e}", update.hash);
                report.rejected += 1;
            }
        }
    }
    report
}
