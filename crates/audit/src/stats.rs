use gadget_chain::Normalizer;
use gadget_protocol::{Language, Submission, SubmissionStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dashboard counters over every stored submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionStats {
    pub by_language: BTreeMap<Language, usize>,
    pub total_submissions: usize,
    /// Chains across all finished submissions
    pub total_chains: usize,
    pub finished: usize,
    pub pending: usize,
    pub failed: usize,
}

impl SubmissionStats {
    pub fn collect(submissions: &[Submission], normalizer: &Normalizer) -> Self {
        let mut stats = Self::default();
        for submission in submissions {
            stats.total_submissions += 1;
            *stats.by_language.entry(submission.language).or_default() += 1;
            match submission.status {
                SubmissionStatus::Pending => stats.pending += 1,
                SubmissionStatus::Failed => stats.failed += 1,
                SubmissionStatus::Finished => {
                    stats.finished += 1;
                    if let Some(raw) = &submission.result {
                        stats.total_chains += normalizer.chains(raw, submission.language).len();
                    }
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadget_protocol::StorageLayout;
    use pretty_assertions::assert_eq;

    fn submission(hash: &str, language: Language, status: SubmissionStatus, raw: Option<&str>) -> Submission {
        let mut s = Submission::pending(hash, "f", language, 0);
        s.status = status;
        s.result = raw.map(str::to_string);
        s
    }

    #[test]
    fn counts_by_language_status_and_chains() {
        let php_raw = concat!(
            r#"{"funcStack":["A#__destruct","B#eval"],"callStack":[]}"#,
            "\n",
            r#"{"funcStack":["C#__wakeup","D#system"],"callStack":[]}"#,
        );
        let submissions = vec![
            submission("a", Language::Php, SubmissionStatus::Finished, Some(php_raw)),
            submission("b", Language::Java, SubmissionStatus::Finished, Some(r#"[["x.A.m()","y.B.n()"]]"#)),
            submission("c", Language::Java, SubmissionStatus::Pending, None),
            submission("d", Language::Php, SubmissionStatus::Failed, None),
        ];

        let stats = SubmissionStats::collect(&submissions, &Normalizer::new(StorageLayout::new("/tmp")));
        assert_eq!(stats.total_submissions, 4);
        assert_eq!(stats.total_chains, 3);
        assert_eq!((stats.finished, stats.pending, stats.failed), (2, 1, 1));
        assert_eq!(stats.by_language.get(&Language::Php), Some(&2));
        assert_eq!(stats.by_language.get(&Language::Java), Some(&2));
    }
}
