use crate::config::AuditConfig;
use crate::store::SubmissionStore;
use crate::{AuditError, Result};
use gadget_chain::{java_method_ref, NormalizedChain, Normalizer};
use gadget_extractor::{read_source_lines, BlockExtractor, FunctionBlock};
use gadget_locator::{Locators, PathOrigin, ResolvedPath, RuntimeCache};
use gadget_protocol::{
    is_content_hash, AuditContext, AuditMeta, AuditStep, FilePosition, Language, StorageLayout,
    Submission, SubmissionStatus,
};
use std::sync::Arc;

/// Which chain of which submission to audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRequest {
    pub hash: String,
    /// 0-based, clamped into range
    pub chain_index: usize,
    /// Overrides the submission's recorded language
    pub language: Option<Language>,
}

impl AuditRequest {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            chain_index: 0,
            language: None,
        }
    }

    #[must_use]
    pub fn with_chain_index(mut self, chain_index: usize) -> Self {
        self.chain_index = chain_index;
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }
}

/// Joins a normalized chain with resolved files and extracted function
/// bodies. Only store failures surface as errors; every per-step problem
/// degrades that step.
pub struct AuditContextBuilder {
    store: SubmissionStore,
    layout: StorageLayout,
    normalizer: Normalizer,
    locators: Locators,
    extractor: BlockExtractor,
}

impl AuditContextBuilder {
    pub fn new(
        store: SubmissionStore,
        layout: StorageLayout,
        runtime: Option<Arc<RuntimeCache>>,
        extractor: BlockExtractor,
    ) -> Self {
        Self {
            store,
            normalizer: Normalizer::new(layout.clone()),
            locators: Locators::new(layout.clone(), runtime),
            layout,
            extractor,
        }
    }

    pub fn from_config(config: &AuditConfig, store: SubmissionStore) -> Result<Self> {
        let extractor = BlockExtractor::new(config.extractor)
            .map_err(|err| AuditError::ConfigError(err.to_string()))?;
        let runtime = config
            .runtime_cache_config()
            .map(|runtime| Arc::new(RuntimeCache::new(runtime)));
        Ok(Self::new(store, config.layout(), runtime, extractor))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    pub async fn build(&self, request: &AuditRequest) -> Result<AuditContext> {
        if !is_content_hash(&request.hash) {
            return Err(AuditError::InvalidHash(request.hash.clone()));
        }
        let submission = self.store.get(&request.hash).await?;
        if submission.status != SubmissionStatus::Finished {
            return Err(AuditError::NotFinished {
                hash: submission.hash,
                status: submission.status,
            });
        }
        Ok(self
            .build_for(&submission, request.chain_index, request.language)
            .await)
    }

    /// Audit context for an already loaded, finished submission.
    pub async fn build_for(
        &self,
        submission: &Submission,
        chain_index: usize,
        language: Option<Language>,
    ) -> AuditContext {
        let language = language.unwrap_or(submission.language);
        let raw = submission.result.as_deref().unwrap_or_default();
        let mut chains = self.normalizer.normalize(raw, language);
        let chain_count = chains.len();

        if chains.is_empty() {
            log::info!("Submission {} has no {language} chains", submission.hash);
            return AuditContext {
                meta: AuditMeta {
                    project: submission.filename.clone(),
                    language,
                    chain_index: 0,
                    chain_count: 0,
                    chain_length: 0,
                    entry: String::new(),
                    sink: String::new(),
                },
                steps: Vec::new(),
            };
        }

        let index = chain_index.min(chain_count - 1);
        if index != chain_index {
            log::debug!("Chain index {chain_index} clamped to {index}");
        }
        let selected = chains.swap_remove(index);

        let mut steps = Vec::with_capacity(selected.chain.len());
        for (i, node) in selected.chain.nodes.iter().enumerate() {
            let position = selected.positions.get(i).cloned().flatten();
            let step = match language {
                Language::Php => {
                    self.php_step(&submission.hash, i + 1, &node.label, position)
                        .await
                }
                Language::Java => self.java_step(&submission.hash, i + 1, &node.label).await,
            };
            steps.push(step);
        }

        AuditContext {
            meta: meta_for(submission, language, index, chain_count, &selected),
            steps,
        }
    }

    async fn php_step(
        &self,
        hash: &str,
        index: usize,
        label: &str,
        position: Option<FilePosition>,
    ) -> AuditStep {
        let Some(position) = position else {
            return AuditStep::unlocated(index, label);
        };

        let locator = self.locators.for_language(Language::Php);
        let Some(resolved) = locator.locate(hash, &position.path).await else {
            let mut step = AuditStep::unlocated(index, label);
            step.resolved_display_path = Some(position.path.clone());
            step.file_name = file_name_of(&position.path);
            step.line = Some(position.line);
            return step;
        };

        let block = match self
            .extractor
            .extract_file(&resolved.absolute, position.line, Language::Php)
        {
            Ok(block) => Some(block),
            Err(e) => {
                log::warn!("No snippet for {}: {e}", resolved.absolute.display());
                None
            }
        };
        located_step(index, label, &resolved, resolved.relative.clone(), position.line, block)
    }

    async fn java_step(&self, hash: &str, index: usize, label: &str) -> AuditStep {
        let Some(method_ref) = java_method_ref(label) else {
            return AuditStep::unlocated(index, label);
        };

        let locator = self.locators.for_language(Language::Java);
        let Some(resolved) = locator.locate(hash, &method_ref.class_path).await else {
            return AuditStep::unlocated(index, label);
        };

        let lines = match read_source_lines(&resolved.absolute) {
            Ok(lines) if !lines.is_empty() => lines,
            Ok(_) => {
                return located_step(index, label, &resolved, self.java_display(&resolved), 1, None)
            }
            Err(e) => {
                log::warn!("No snippet for {}: {e}", resolved.absolute.display());
                return located_step(index, label, &resolved, self.java_display(&resolved), 1, None);
            }
        };

        let method = declared_name(&method_ref.method, &method_ref.class_path);
        let line = method
            .and_then(|name| self.extractor.find_method_line(&lines, name, Language::Java))
            .unwrap_or(1);
        let block = self.extractor.extract_lines(&lines, line, Language::Java);
        located_step(index, label, &resolved, self.java_display(&resolved), line, Some(block))
    }

    /// Relative path with the leading decompiled-output segment dropped.
    fn java_display(&self, resolved: &ResolvedPath) -> String {
        if resolved.origin == PathOrigin::SharedRuntime {
            return resolved.relative.clone();
        }
        let prefix = format!("{}/", self.layout.decompiled_dir());
        resolved
            .relative
            .strip_prefix(&prefix)
            .unwrap_or(&resolved.relative)
            .to_string()
    }
}

fn meta_for(
    submission: &Submission,
    language: Language,
    index: usize,
    chain_count: usize,
    selected: &NormalizedChain,
) -> AuditMeta {
    let nodes = &selected.chain.nodes;
    AuditMeta {
        project: submission.filename.clone(),
        language,
        chain_index: index + 1,
        chain_count,
        chain_length: nodes.len(),
        entry: nodes.first().map(|n| n.label.clone()).unwrap_or_default(),
        sink: nodes.last().map(|n| n.label.clone()).unwrap_or_default(),
    }
}

fn located_step(
    index: usize,
    label: &str,
    resolved: &ResolvedPath,
    display_path: String,
    line: usize,
    block: Option<FunctionBlock>,
) -> AuditStep {
    let mut step = AuditStep::unlocated(index, label);
    step.found = true;
    step.resolved_display_path = Some(display_path);
    step.file_name = resolved.file_name();
    step.line = Some(line);
    if let Some(block) = block {
        step.function_name = block.function_name;
        step.start_line = Some(block.start_line);
        step.end_line = Some(block.end_line);
        step.code_lines = Some(block.code_lines);
    }
    step
}

/// Name the method is declared under: constructors use the class simple
/// name, static initializers have none.
fn declared_name<'a>(method: &'a str, class_path: &'a str) -> Option<&'a str> {
    match method {
        "<clinit>" => None,
        "<init>" => {
            let file = class_path.rsplit('/').next().unwrap_or(class_path);
            let stem = file.strip_suffix(".java").unwrap_or(file);
            stem.rsplit('$').next().filter(|s| !s.is_empty())
        }
        other => Some(other),
    }
}

fn file_name_of(raw_path: &str) -> Option<String> {
    raw_path
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
