use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use gadget_audit::AuditConfig;
use gadget_protocol::Language;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "gadget-audit")]
#[command(about = "Normalize gadget-chain analyzer output and audit chains against source", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file (overrides GADGET_AUDIT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Upload root holding `<lang>/<hash>/` submission trees
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Directory for submission records
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an uploaded artifact as a pending submission
    Register(RegisterArgs),

    /// Print the canonical chains of a finished submission
    Chains(HashArgs),

    /// Print one chain, or every chain merged into one graph
    Graph(GraphArgs),

    /// Resolve every step of a chain to source and extract function bodies
    Audit(AuditArgs),

    /// Render the bounded plain-text audit context for a language model
    Prompt(PromptArgs),

    /// Submission counters by language and status
    Stats,

    /// Run pending submissions through the configured analyzers
    Analyze,

    /// Normalize a raw analyzer output file without the store
    Normalize(NormalizeArgs),
}

#[derive(Args)]
struct RegisterArgs {
    /// Uploaded artifact
    file: PathBuf,

    /// Target language: php|java
    #[arg(long)]
    lang: Language,
}

#[derive(Args)]
struct HashArgs {
    /// Submission content hash
    hash: String,
}

#[derive(Args)]
struct GraphArgs {
    /// Submission content hash
    hash: String,

    /// Chain index (0-based, clamped)
    #[arg(long, default_value_t = 0, conflicts_with = "all")]
    chain: usize,

    /// Merge every chain into one graph
    #[arg(long)]
    all: bool,
}

#[derive(Args)]
struct AuditArgs {
    /// Submission content hash
    hash: String,

    /// Chain index (0-based, clamped)
    #[arg(long, default_value_t = 0)]
    idx: usize,

    /// Override the recorded language
    #[arg(long)]
    lang: Option<Language>,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PromptArgs {
    /// Submission content hash
    hash: String,

    /// Chain index (0-based, clamped)
    #[arg(long, default_value_t = 0)]
    idx: usize,
}

#[derive(Args)]
struct NormalizeArgs {
    /// Raw analyzer output
    file: PathBuf,

    /// Analyzer language: php|java
    #[arg(long)]
    lang: Language,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Audit(args) => args.json,
        Commands::Prompt(_) => false,
        _ => true,
    };
    if json_output && !cli.verbose {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AuditConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(root) = cli.storage_root {
        config.storage_root = root;
    }
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }

    match cli.command {
        Commands::Register(args) => commands::run_register(&config, &args.file, args.lang).await?,
        Commands::Chains(args) => commands::run_chains(&config, &args.hash).await?,
        Commands::Graph(args) => {
            let selection = if args.all {
                commands::GraphSelection::All
            } else {
                commands::GraphSelection::Chain(args.chain)
            };
            commands::run_graph(&config, &args.hash, selection).await?
        }
        Commands::Audit(args) => {
            commands::run_audit(&config, &args.hash, args.idx, args.lang, args.json).await?
        }
        Commands::Prompt(args) => commands::run_prompt(&config, &args.hash, args.idx).await?,
        Commands::Stats => commands::run_stats(&config).await?,
        Commands::Analyze => commands::run_analyze(&config).await?,
        Commands::Normalize(args) => commands::run_normalize(&config, &args.file, args.lang)?,
    }

    Ok(())
}
