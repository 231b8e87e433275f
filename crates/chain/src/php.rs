use crate::error::RecordError;
use crate::format::{
    after_member_separator, first_identifier, leading_identifier, ChainFormat, RawChain, RawStep,
};
use gadget_protocol::{FilePosition, Language, StorageLayout};
use serde::Deserialize;
use serde_json::Value;

/// Newline-delimited JSON, one chain per line:
/// `{"funcStack": ["A#__destruct", ...], "callStack": [["/path/a.php", 10], ...]}`.
///
/// `callStack` may be shorter than `funcStack`; missing entries mean the
/// step has no known location.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpFormat;

#[derive(Debug, Deserialize)]
struct PhpRecord {
    #[serde(rename = "funcStack")]
    func_stack: Option<Vec<String>>,
    #[serde(rename = "callStack", default)]
    call_stack: Vec<Value>,
}

impl PhpFormat {
    fn parse_line(&self, line: &str, layout: &StorageLayout) -> Result<RawChain, RecordError> {
        let record: PhpRecord = serde_json::from_str(line)?;
        let func_stack = record.func_stack.ok_or(RecordError::MissingField("funcStack"))?;

        let mut steps = Vec::with_capacity(func_stack.len());
        let mut edge_labels = Vec::with_capacity(func_stack.len().saturating_sub(1));
        for (i, label) in func_stack.into_iter().enumerate() {
            let position = record
                .call_stack
                .get(i)
                .and_then(parse_call_site)
                .map(|pos| FilePosition {
                    path: layout.canonicalize_reported_path(&pos.path),
                    line: pos.line,
                });
            edge_labels.push(Some(match &position {
                Some(pos) => format!("#{}@L{}", i + 1, pos.line),
                None => format!("#{}", i + 1),
            }));
            steps.push(RawStep {
                label: label.trim().to_string(),
                short: None,
                position,
            });
        }
        // one label per edge, none after the last step
        edge_labels.truncate(steps.len().saturating_sub(1));

        Ok(RawChain { steps, edge_labels })
    }
}

impl ChainFormat for PhpFormat {
    fn language(&self) -> Language {
        Language::Php
    }

    fn records(&self, raw: &str, layout: &StorageLayout) -> Vec<RawChain> {
        let mut records = Vec::new();
        for (line_num, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match self.parse_line(trimmed, layout) {
                Ok(record) => records.push(record),
                Err(err) => log::debug!("Skipping PHP chain line {}: {err}", line_num + 1),
            }
        }
        records
    }

    fn short_label(&self, label: &str) -> String {
        if let Some(tail) = after_member_separator(label) {
            return leading_identifier(tail).unwrap_or(tail).to_string();
        }
        first_identifier(label)
            .map(str::to_string)
            .unwrap_or_else(|| label.to_string())
    }
}

/// `[path, line]`; the line may arrive as a number or a numeric string.
fn parse_call_site(value: &Value) -> Option<FilePosition> {
    let pair = value.as_array()?;
    let path = pair.first()?.as_str()?.trim();
    if path.is_empty() {
        return None;
    }
    let line = match pair.get(1)? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    Some(FilePosition {
        path: path.to_string(),
        line: usize::try_from(line).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HASH: &str = "d41d8cd98f00b204e9800998ecf8427e";

    fn layout() -> StorageLayout {
        StorageLayout::new("/srv/uploads")
    }

    #[test]
    fn short_labels() {
        let php = PhpFormat;
        assert_eq!(php.short_label("A#__destruct"), "__destruct");
        assert_eq!(php.short_label("Vendor\\Pkg\\Cls::__toString"), "__toString");
        assert_eq!(php.short_label("Cls#&getIterator"), "getIterator");
        assert_eq!(php.short_label("system  "), "system");
        assert_eq!(php.short_label("call_user_func (dynamic)"), "call_user_func");
        assert_eq!(php.short_label("%%%"), "%%%");
    }

    #[test]
    fn aligns_shorter_call_stack() {
        let line = r#"{"funcStack":["A#__destruct","B#__wakeup","C#eval"],"callStack":[["/root/proj/a.php",10],["/root/proj/b.php",20]]}"#;
        let records = PhpFormat.records(line, &layout());
        assert_eq!(records.len(), 1);
        let steps = &records[0].steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0].position,
            Some(FilePosition {
                path: "/root/proj/a.php".into(),
                line: 10
            })
        );
        assert!(steps[2].position.is_none());
        assert_eq!(
            records[0].edge_labels,
            vec![Some("#1@L10".to_string()), Some("#2@L20".to_string())]
        );
    }

    #[test]
    fn canonicalizes_anchored_paths() {
        let line = format!(
            r#"{{"funcStack":["A#__destruct"],"callStack":[["/other/host/uploads/php/{HASH}/src/a.php",7]]}}"#
        );
        let records = PhpFormat.records(&line, &layout());
        let pos = records[0].steps[0].position.clone().unwrap();
        assert_eq!(pos.path, format!("uploads/php/{HASH}/src/a.php"));
        assert_eq!(pos.line, 7);
    }

    #[test]
    fn skips_malformed_lines() {
        let raw = concat!(
            "not json\n",
            "{\"callStack\": []}\n",
            "{\"funcStack\": [1, 2]}\n",
            "\n",
            "{\"funcStack\": [\"A#x\", \"B#y\"]}\n",
        );
        let records = PhpFormat.records(raw, &layout());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].steps[1].label, "B#y");
    }

    #[test]
    fn malformed_call_site_only_drops_position() {
        let line = r#"{"funcStack":["A#x","B#y"],"callStack":[["a.php"],["b.php","12"]]}"#;
        let records = PhpFormat.records(line, &layout());
        assert!(records[0].steps[0].position.is_none());
        assert_eq!(records[0].steps[1].position.as_ref().map(|p| p.line), Some(12));
    }
}
