//! # Gadget Audit
//!
//! Submission lifecycle and the audit trail built on top of normalized
//! chains.
//!
//! ```text
//! register ──> SubmissionStore (pending)
//!                  │
//!   AnalysisPool ──┤  workers (Semaphore) ──StatusUpdate──> applier
//!                  │                                    finish / fail
//!                  ▼
//!   AuditContextBuilder
//!     Normalizer ─> chain[idx] ─> Locators ─> BlockExtractor ─> AuditContext
//!                                                                  │
//!                                                   render_prompt ─┘
//! ```

mod builder;
mod config;
mod error;
mod prompt;
mod stats;
mod store;
mod worker;

pub use builder::{AuditContextBuilder, AuditRequest};
pub use config::{
    AnalyzerCommands, AuditConfig, PromptBudget, ToolCommand, CONCURRENCY_ENV, CONFIG_ENV,
    DECOMPILER_ENV, RUNTIME_JAR_ENV, STATE_DIR_ENV, STORAGE_ROOT_ENV,
};
pub use error::{AuditError, Result};
pub use prompt::{render_prompt, truncate_snippet, TRUNCATION_MARKER};
pub use stats::SubmissionStats;
pub use store::{content_hash, SubmissionStore};
pub use worker::{
    AnalysisOutcome, AnalysisPool, Analyzer, CommandAnalyzer, PoolReport, StatusUpdate,
};
