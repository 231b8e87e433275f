use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::signature::signature_name;
use gadget_protocol::Language;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the snippet bounds were decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Signature found and braces balanced (or clipped at the body limit)
    Function,
    /// Signature found but no opening brace nearby
    SignatureOnly,
    /// No signature within the window; plain window around the line
    Window,
}

/// Extracted source lines, 1-based inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionBlock {
    pub function_name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub code_lines: Vec<String>,
    pub kind: BlockKind,
}

/// Reads a source file as lines, tolerating invalid UTF-8.
pub fn read_source_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.lines().map(str::to_string).collect())
}

#[derive(Debug, Clone, Default)]
pub struct BlockExtractor {
    config: ExtractorConfig,
}

impl BlockExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate().map_err(ExtractorError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract_file(&self, path: &Path, line: usize, language: Language) -> Result<FunctionBlock> {
        let lines = read_source_lines(path)?;
        if lines.is_empty() {
            return Err(ExtractorError::EmptyFile(path.to_path_buf()));
        }
        Ok(self.extract_lines(&lines, line, language))
    }

    /// Enclosing function of `line` (1-based). `lines` must be non-empty.
    pub fn extract_lines(&self, lines: &[String], line: usize, language: Language) -> FunctionBlock {
        let total = lines.len();
        if total == 0 {
            return FunctionBlock {
                function_name: None,
                start_line: 1,
                end_line: 0,
                code_lines: Vec::new(),
                kind: BlockKind::Window,
            };
        }
        let line = line.clamp(1, total);

        let Some((sig_line, name)) = self.find_signature_before(lines, line, language) else {
            log::debug!("No {language} signature within {} lines of {line}", self.config.window);
            let (start, end) = window_around(line, self.config.fallback_radius, total);
            return block(lines, None, start, end, BlockKind::Window);
        };

        let brace_limit = (sig_line + self.config.brace_search_lines - 1).min(total);
        let Some(open_line) = (sig_line..=brace_limit).find(|&ln| lines[ln - 1].contains('{')) else {
            let (start, end) = window_around(sig_line, self.config.signature_radius, total);
            return block(lines, Some(name), start, end, BlockKind::SignatureOnly);
        };

        let end_line = self
            .balanced_end(lines, open_line)
            .unwrap_or_else(|| (open_line + self.config.max_body_lines).min(total));

        block(lines, Some(name), sig_line, end_line, BlockKind::Function)
    }

    /// First line declaring `method`, for steps that only know the method name.
    pub fn find_method_line(&self, lines: &[String], method: &str, language: Language) -> Option<usize> {
        lines
            .iter()
            .position(|line| signature_name(language, line) == Some(method))
            .map(|idx| idx + 1)
    }

    fn find_signature_before(
        &self,
        lines: &[String],
        line: usize,
        language: Language,
    ) -> Option<(usize, String)> {
        let lowest = line.saturating_sub(self.config.window - 1).max(1);
        (lowest..=line).rev().find_map(|ln| {
            signature_name(language, &lines[ln - 1]).map(|name| (ln, name.to_string()))
        })
    }

    /// First line at or after `open_line` where the running `{`/`}` balance
    /// returns to zero after having opened, within the window.
    fn balanced_end(&self, lines: &[String], open_line: usize) -> Option<usize> {
        let last = (open_line + self.config.window - 1).min(lines.len());
        let mut depth: i64 = 0;
        let mut opened = false;
        for ln in open_line..=last {
            for ch in lines[ln - 1].chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            if opened && depth == 0 {
                return Some(ln);
            }
        }
        None
    }
}

fn window_around(line: usize, radius: usize, total: usize) -> (usize, usize) {
    (line.saturating_sub(radius).max(1), (line + radius).min(total))
}

fn block(
    lines: &[String],
    function_name: Option<String>,
    start_line: usize,
    end_line: usize,
    kind: BlockKind,
) -> FunctionBlock {
    FunctionBlock {
        function_name,
        start_line,
        end_line,
        code_lines: lines[start_line - 1..end_line].to_vec(),
        kind,
    }
}
