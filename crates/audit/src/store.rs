use crate::{AuditError, Result};
use gadget_protocol::{is_content_hash, Language, Submission, SubmissionStatus};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const SUBMISSIONS_DIR: &str = "submissions";

/// SHA-256 of the uploaded bytes, lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// One JSON record per submission under `<state_dir>/submissions/<hash>.json`.
///
/// Every write goes to a temp file first and is renamed into place, so a
/// reader sees either the old or the new record.
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    dir: PathBuf,
}

impl SubmissionStore {
    pub async fn open(state_dir: &Path) -> Result<Self> {
        let dir = state_dir.join(SUBMISSIONS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a `pending` record. Registering the same hash again with the
    /// same metadata returns the existing record.
    pub async fn register(
        &self,
        hash: &str,
        filename: &str,
        language: Language,
    ) -> Result<Submission> {
        if let Some(existing) = self.find(hash).await? {
            if existing.filename == filename && existing.language == language {
                return Ok(existing);
            }
            return Err(AuditError::Conflict(hash.to_string()));
        }

        let submission = Submission::pending(hash, filename, language, unix_now_ms());
        self.write(&submission).await?;
        log::info!("Registered {language} submission {hash} ({filename})");
        Ok(submission)
    }

    pub async fn find(&self, hash: &str) -> Result<Option<Submission>> {
        let path = self.record_path(hash)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub async fn get(&self, hash: &str) -> Result<Submission> {
        self.find(hash)
            .await?
            .ok_or_else(|| AuditError::UnknownSubmission(hash.to_string()))
    }

    /// All records, sorted by hash. Unreadable records are skipped.
    pub async fn list(&self) -> Result<Vec<Submission>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut submissions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(hash) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            if !is_content_hash(hash) {
                continue;
            }
            match self.find(hash).await {
                Ok(Some(submission)) => submissions.push(submission),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable record {}: {e}", path.display()),
            }
        }
        submissions.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(submissions)
    }

    pub async fn pending(&self) -> Result<Vec<Submission>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .collect())
    }

    /// `pending → finished` with the analyzer's raw output.
    pub async fn finish(&self, hash: &str, raw_result: String) -> Result<Submission> {
        let mut submission = self.transition(hash, SubmissionStatus::Finished).await?;
        submission.result = Some(raw_result);
        self.write(&submission).await?;
        log::info!("Submission {hash} finished");
        Ok(submission)
    }

    /// `pending → failed`.
    pub async fn fail(&self, hash: &str, reason: &str) -> Result<Submission> {
        let mut submission = self.transition(hash, SubmissionStatus::Failed).await?;
        submission.failure_reason = Some(reason.to_string());
        self.write(&submission).await?;
        log::warn!("Submission {hash} failed: {reason}");
        Ok(submission)
    }

    async fn transition(&self, hash: &str, to: SubmissionStatus) -> Result<Submission> {
        let mut submission = self.get(hash).await?;
        if submission.status != SubmissionStatus::Pending {
            return Err(AuditError::InvalidTransition {
                hash: hash.to_string(),
                from: submission.status,
                to,
            });
        }
        submission.status = to;
        Ok(submission)
    }

    async fn write(&self, submission: &Submission) -> Result<()> {
        let path = self.record_path(&submission.hash)?;
        let bytes = serde_json::to_vec_pretty(submission)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn record_path(&self, hash: &str) -> Result<PathBuf> {
        if !is_content_hash(hash) {
            return Err(AuditError::InvalidHash(hash.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", hash.to_ascii_lowercase())))
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
