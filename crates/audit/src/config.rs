use crate::{AuditError, Result};
use gadget_extractor::ExtractorConfig;
use gadget_locator::{DecompilerCommand, RuntimeCacheConfig};
use gadget_protocol::{Language, StorageLayout, DEFAULT_DECOMPILED_DIR, DEFAULT_PSEUDO_ROOT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "GADGET_AUDIT_CONFIG";
pub const STORAGE_ROOT_ENV: &str = "GADGET_AUDIT_STORAGE_ROOT";
pub const STATE_DIR_ENV: &str = "GADGET_AUDIT_STATE_DIR";
pub const RUNTIME_JAR_ENV: &str = "GADGET_AUDIT_RUNTIME_JAR";
pub const DECOMPILER_ENV: &str = "GADGET_AUDIT_DECOMPILER";
pub const CONCURRENCY_ENV: &str = "GADGET_AUDIT_CONCURRENCY";

const MAX_CONCURRENT_ANALYSES: usize = 32;

/// An external program. `{input}` and `{output}` in `args` are substituted
/// per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Whitespace-separated `program arg…`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn expanded_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerCommands {
    pub php: Option<ToolCommand>,
    pub java: Option<ToolCommand>,
}

impl AnalyzerCommands {
    pub fn for_language(&self, language: Language) -> Option<&ToolCommand> {
        match language {
            Language::Php => self.php.as_ref(),
            Language::Java => self.java.as_ref(),
        }
    }
}

/// Bounds for the plain-text audit context handed to a language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptBudget {
    pub max_steps: usize,
    pub max_snippet_chars: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            max_steps: 20,
            max_snippet_chars: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Real upload root; a submission lives at `<storage_root>/<lang>/<hash>`
    pub storage_root: PathBuf,
    /// Upload root segment as it appears in analyzer-reported paths
    pub storage_dir_name: String,
    /// Submission records
    pub state_dir: PathBuf,
    pub decompiled_dir_name: String,

    /// Bundled standard-runtime archive; Java runtime lookups are skipped when unset
    pub runtime_jar: Option<PathBuf>,
    pub runtime_cache_dir: PathBuf,
    pub decompiler: ToolCommand,
    pub decompiler_timeout_secs: u64,

    pub analyzers: AnalyzerCommands,
    pub analysis_timeout_secs: u64,
    pub max_concurrent_analyses: usize,

    pub extractor: ExtractorConfig,
    pub prompt: PromptBudget,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_PSEUDO_ROOT),
            storage_dir_name: DEFAULT_PSEUDO_ROOT.to_string(),
            state_dir: PathBuf::from(".gadget-audit"),
            decompiled_dir_name: DEFAULT_DECOMPILED_DIR.to_string(),
            runtime_jar: None,
            runtime_cache_dir: PathBuf::from(".gadget-audit/runtime"),
            decompiler: ToolCommand {
                program: "java".to_string(),
                args: vec![
                    "-jar".to_string(),
                    "cfr.jar".to_string(),
                    "{input}".to_string(),
                    "--outputdir".to_string(),
                    "{output}".to_string(),
                ],
            },
            decompiler_timeout_secs: 900,
            analyzers: AnalyzerCommands::default(),
            analysis_timeout_secs: 1800,
            max_concurrent_analyses: 2,
            extractor: ExtractorConfig::default(),
            prompt: PromptBudget::default(),
        }
    }
}

impl AuditConfig {
    /// Defaults, then the TOML file (`path`, else `GADGET_AUDIT_CONFIG`), then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            AuditError::ConfigError(format!("read {}: {err}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|err| AuditError::ConfigError(format!("{}: {err}", path.display())))
    }

    /// Missing keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| AuditError::ConfigError(err.to_string()))
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = non_empty(STORAGE_ROOT_ENV) {
            self.storage_root = PathBuf::from(root);
        }
        if let Some(dir) = non_empty(STATE_DIR_ENV) {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(jar) = non_empty(RUNTIME_JAR_ENV) {
            self.runtime_jar = Some(PathBuf::from(jar));
        }
        if let Some(command) = non_empty(DECOMPILER_ENV).and_then(|v| ToolCommand::parse(&v)) {
            self.decompiler = command;
        }
        if let Some(raw) = non_empty(CONCURRENCY_ENV) {
            self.max_concurrent_analyses =
                parse_concurrency(Some(&raw), self.max_concurrent_analyses);
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.storage_dir_name.trim().is_empty() {
            return Err(AuditError::ConfigError(
                "storage_dir_name must not be empty".to_string(),
            ));
        }
        if self.decompiled_dir_name.trim().is_empty() {
            return Err(AuditError::ConfigError(
                "decompiled_dir_name must not be empty".to_string(),
            ));
        }
        self.extractor
            .validate()
            .map_err(|err| AuditError::ConfigError(format!("extractor: {err}")))?;
        if self.prompt.max_steps == 0 {
            return Err(AuditError::ConfigError(
                "prompt.max_steps must be > 0".to_string(),
            ));
        }
        self.max_concurrent_analyses = self.max_concurrent_analyses.clamp(1, MAX_CONCURRENT_ANALYSES);
        Ok(())
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.storage_root)
            .with_pseudo_root(&self.storage_dir_name)
            .with_decompiled_dir(&self.decompiled_dir_name)
    }

    /// `None` when no runtime archive is configured.
    pub fn runtime_cache_config(&self) -> Option<RuntimeCacheConfig> {
        let archive = self.runtime_jar.clone()?;
        Some(RuntimeCacheConfig {
            archive,
            cache_dir: self.runtime_cache_dir.clone(),
            decompiler: DecompilerCommand::new(
                self.decompiler.program.clone(),
                self.decompiler.args.clone(),
            ),
            timeout: Duration::from_secs(self.decompiler_timeout_secs),
        })
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

fn parse_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CONCURRENT_ANALYSES)
}
