use crate::config::PromptBudget;
use gadget_protocol::{AuditContext, AuditStep};
use std::fmt::Write as _;

pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Cuts `text` to `max_chars` characters and appends [`TRUNCATION_MARKER`];
/// shorter text is returned unchanged.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Plain-text audit context for a language model. The meta line is always
/// present; steps past `max_steps` are summarized in one line.
pub fn render_prompt(context: &AuditContext, budget: &PromptBudget) -> String {
    let meta = &context.meta;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Project: {} | Language: {} | Chain {}/{} | Length: {} | Entry: {} | Sink: {}",
        meta.project,
        meta.language,
        meta.chain_index,
        meta.chain_count,
        meta.chain_length,
        meta.entry,
        meta.sink
    );

    for step in context.steps.iter().take(budget.max_steps) {
        out.push('\n');
        render_step(&mut out, step, budget.max_snippet_chars);
    }

    let omitted = context.steps.len().saturating_sub(budget.max_steps);
    if omitted > 0 {
        let _ = writeln!(out, "\n... {omitted} more step(s) omitted");
    }
    out
}

fn render_step(out: &mut String, step: &AuditStep, max_snippet_chars: usize) {
    let _ = writeln!(out, "Step {}: {}", step.index, step.label);

    let location = match (&step.resolved_display_path, step.line) {
        (Some(path), Some(line)) => format!("{path}:{line}"),
        (Some(path), None) => path.clone(),
        (None, _) => "unknown".to_string(),
    };
    if step.found {
        let _ = writeln!(out, "Location: {location}");
    } else {
        let _ = writeln!(out, "Location: {location} (source not found)");
    }

    if let (Some(start), Some(end)) = (step.start_line, step.end_line) {
        let name = step.function_name.as_deref().unwrap_or("<anonymous>");
        let _ = writeln!(out, "Function: {name} (lines {start}-{end})");
    }
    if let Some(code) = &step.code_lines {
        let snippet = truncate_snippet(&code.join("\n"), max_snippet_chars);
        let _ = writeln!(out, "```\n{snippet}\n```");
    }
}
