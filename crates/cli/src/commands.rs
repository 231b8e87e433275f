use anyhow::{bail, Context as AnyhowContext, Result};
use gadget_audit::{
    content_hash, render_prompt, AnalysisPool, AuditConfig, AuditContextBuilder, AuditRequest,
    CommandAnalyzer, PromptBudget, SubmissionStats, SubmissionStore,
};
use gadget_chain::{merge_chains, Normalizer};
use gadget_protocol::{Language, Submission, SubmissionStatus};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub enum GraphSelection {
    Chain(usize),
    All,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(config: &AuditConfig) -> Result<SubmissionStore> {
    SubmissionStore::open(&config.state_dir)
        .await
        .with_context(|| format!("Failed to open store in {}", config.state_dir.display()))
}

async fn finished_submission(store: &SubmissionStore, hash: &str) -> Result<Submission> {
    let submission = store.get(hash).await?;
    if submission.status != SubmissionStatus::Finished {
        bail!("Submission {hash} is {:?}, not finished", submission.status);
    }
    Ok(submission)
}

pub async fn run_register(config: &AuditConfig, file: &Path, language: Language) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let hash = content_hash(&bytes);
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("Artifact path has no file name")?;

    let store = open_store(config).await?;
    let submission = store.register(&hash, &filename, language).await?;

    let root = config.layout().submission_root(language, &hash);
    tokio::fs::create_dir_all(&root).await?;
    let stored = root.join(&filename);
    if !stored.exists() {
        tokio::fs::write(&stored, &bytes).await?;
    }

    print_json(&submission)
}

pub async fn run_chains(config: &AuditConfig, hash: &str) -> Result<()> {
    let store = open_store(config).await?;
    let submission = finished_submission(&store, hash).await?;
    let normalizer = Normalizer::new(config.layout());
    let chains = normalizer.chains(
        submission.result.as_deref().unwrap_or_default(),
        submission.language,
    );
    print_json(&chains)
}

pub async fn run_graph(config: &AuditConfig, hash: &str, selection: GraphSelection) -> Result<()> {
    let store = open_store(config).await?;
    let submission = finished_submission(&store, hash).await?;
    let normalizer = Normalizer::new(config.layout());
    let chains = normalizer.chains(
        submission.result.as_deref().unwrap_or_default(),
        submission.language,
    );

    match selection {
        GraphSelection::All => {
            let merged = merge_chains(&chains);
            log::info!(
                "Merged {} chain(s) into {} node(s), {} edge(s)",
                chains.len(),
                merged.node_count(),
                merged.edge_count()
            );
            print_json(&merged)
        }
        GraphSelection::Chain(index) => {
            let Some(last) = chains.len().checked_sub(1) else {
                bail!("Submission {hash} has no chains");
            };
            print_json(&chains[index.min(last)])
        }
    }
}

pub async fn run_audit(
    config: &AuditConfig,
    hash: &str,
    chain_index: usize,
    language: Option<Language>,
    json: bool,
) -> Result<()> {
    let store = open_store(config).await?;
    let builder = AuditContextBuilder::from_config(config, store)?;
    let request = AuditRequest::new(hash)
        .with_chain_index(chain_index)
        .with_language(language);
    let context = builder.build(&request).await?;

    if json {
        return print_json(&context);
    }
    let unbounded = PromptBudget {
        max_steps: usize::MAX,
        max_snippet_chars: usize::MAX,
    };
    print!("{}", render_prompt(&context, &unbounded));
    Ok(())
}

pub async fn run_prompt(config: &AuditConfig, hash: &str, chain_index: usize) -> Result<()> {
    let store = open_store(config).await?;
    let builder = AuditContextBuilder::from_config(config, store)?;
    let context = builder
        .build(&AuditRequest::new(hash).with_chain_index(chain_index))
        .await?;
    print!("{}", render_prompt(&context, &config.prompt));
    Ok(())
}

pub async fn run_stats(config: &AuditConfig) -> Result<()> {
    let store = open_store(config).await?;
    let submissions = store.list().await?;
    let stats = SubmissionStats::collect(&submissions, &Normalizer::new(config.layout()));
    print_json(&stats)
}

pub async fn run_analyze(config: &AuditConfig) -> Result<()> {
    let store = open_store(config).await?;
    let pending = store.pending().await?;
    let analyzer = Arc::new(CommandAnalyzer::new(
        config.analyzers.clone(),
        config.analysis_timeout(),
    ));
    let pool = AnalysisPool::new(analyzer, config.layout(), config.max_concurrent_analyses);
    let report = pool.run(&store, pending).await;

    print_json(&report)
}

pub fn run_normalize(config: &AuditConfig, file: &Path, language: Language) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let raw = String::from_utf8_lossy(&bytes);
    let chains = Normalizer::new(config.layout()).chains(&raw, language);
    print_json(&chains)
}
