use crate::error::RecordError;
use crate::format::{after_member_separator, leading_identifier, ChainFormat, RawChain, RawStep};
use gadget_protocol::{Language, StorageLayout};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Soot-style signature: `<pkg.Class: RetType method(Args)>`.
static BRACKETED_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<\s*([^:<>\s]+)\s*:\s*[^\s()]+\s+([^\s(]+)\s*\(").expect("valid regex")
});

static CALL_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*(?:\(|$)").expect("valid regex"));

/// Keys under which an entry may carry its ordered label list.
const LABEL_LIST_KEYS: &[&str] = &["path", "funcStack", "gc_stack"];

/// One JSON document: either `[entry, …]` or `{"chains": [entry, …]}` where
/// each entry is `{nodes, edges}`, `{path|funcStack|gc_stack: [label, …]}`,
/// or a bare `[label, …]`. Java chains carry no aligned positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaFormat;

/// Source location hint derived from a Java step label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaMethodRef {
    /// `pkg/Outer$Inner.java`; inner-class qualifiers are left for the locator
    pub class_path: String,
    pub method: String,
}

impl JavaFormat {
    fn parse_entry(&self, entry: &Value) -> Result<RawChain, RecordError> {
        match entry {
            Value::Array(items) => Ok(RawChain {
                steps: label_list(items)?,
                edge_labels: Vec::new(),
            }),
            Value::Object(map) if map.contains_key("nodes") => self.parse_graph_entry(map),
            Value::Object(map) => {
                let items = LABEL_LIST_KEYS
                    .iter()
                    .find_map(|key| map.get(*key))
                    .ok_or(RecordError::MissingField("path|funcStack|gc_stack"))?
                    .as_array()
                    .ok_or_else(|| RecordError::shape("label list is not an array"))?;
                Ok(RawChain {
                    steps: label_list(items)?,
                    edge_labels: Vec::new(),
                })
            }
            other => Err(RecordError::shape(format!(
                "chain entry must be an array or object, got {}",
                json_kind(other)
            ))),
        }
    }

    /// `{nodes, edges}` keeps node order; edges are rebuilt linearly and carry
    /// over the label of any input edge joining the same pair.
    fn parse_graph_entry(&self, map: &Map<String, Value>) -> Result<RawChain, RecordError> {
        let nodes = map
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| RecordError::shape("nodes is not an array"))?;

        let mut original_ids = Vec::with_capacity(nodes.len());
        let mut steps = Vec::with_capacity(nodes.len());
        for node in nodes {
            let obj = node
                .as_object()
                .ok_or_else(|| RecordError::shape("node is not an object"))?;
            let id = obj.get("id").map(id_string);
            let label = obj
                .get("label")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| id.clone())
                .ok_or(RecordError::MissingField("label"))?;
            let short = obj
                .get("short")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            original_ids.push(id.unwrap_or_else(|| label.clone()));
            steps.push(RawStep {
                label: label.trim().to_string(),
                short,
                position: None,
            });
        }

        let mut pair_labels: HashMap<(String, String), String> = HashMap::new();
        if let Some(edges) = map.get("edges").and_then(Value::as_array) {
            for edge in edges {
                let Some(obj) = edge.as_object() else {
                    continue;
                };
                let (Some(from), Some(to)) = (obj.get("from"), obj.get("to")) else {
                    continue;
                };
                let label = obj
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                pair_labels
                    .entry((id_string(from), id_string(to)))
                    .or_insert(label);
            }
        }

        let edge_labels = original_ids
            .windows(2)
            .map(|pair| {
                pair_labels
                    .get(&(pair[0].clone(), pair[1].clone()))
                    .filter(|label| !label.is_empty())
                    .cloned()
            })
            .collect();

        Ok(RawChain { steps, edge_labels })
    }
}

impl ChainFormat for JavaFormat {
    fn language(&self) -> Language {
        Language::Java
    }

    fn records(&self, raw: &str, _layout: &StorageLayout) -> Vec<RawChain> {
        let document: Value = match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Java chain document is not valid JSON: {err}");
                return Vec::new();
            }
        };

        let entries: Vec<&Value> = match &document {
            Value::Array(items) if items.iter().all(Value::is_string) && !items.is_empty() => {
                // a single bare chain rather than a list of chains
                vec![&document]
            }
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => match map.get("chains") {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(_) => {
                    log::warn!("Java chain document has a non-array `chains` field");
                    Vec::new()
                }
                None => vec![&document],
            },
            other => {
                log::warn!("Java chain document is a {}", json_kind(other));
                Vec::new()
            }
        };

        let mut records = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            match self.parse_entry(entry) {
                Ok(record) => records.push(record),
                Err(err) => log::debug!("Skipping Java chain entry {idx}: {err}"),
            }
        }
        records
    }

    fn short_label(&self, label: &str) -> String {
        if let Some(caps) = BRACKETED_SIGNATURE.captures(label) {
            if let Some(method) = caps.get(2) {
                return method.as_str().to_string();
            }
        }
        if let Some(tail) = after_member_separator(label) {
            return leading_identifier(tail).unwrap_or(tail).to_string();
        }
        CALL_IDENT
            .captures(label.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| label.to_string())
    }
}

/// Derives `pkg/Class.java` + method name from a Java step label.
pub fn java_method_ref(label: &str) -> Option<JavaMethodRef> {
    let (class, method) = if let Some(caps) = BRACKETED_SIGNATURE.captures(label) {
        (caps.get(1)?.as_str(), caps.get(2)?.as_str())
    } else if let Some(tail) = after_member_separator(label) {
        let sep = label.len() - tail.len();
        let class = label[..sep].trim_end().trim_end_matches(['#', ':']).trim();
        (class, leading_identifier(tail).unwrap_or(tail))
    } else {
        let head = label.split('(').next().unwrap_or(label).trim();
        head.rsplit_once('.')?
    };

    let class = class.trim();
    if class.is_empty() || method.is_empty() {
        return None;
    }
    Some(JavaMethodRef {
        class_path: format!("{}.java", class.replace('.', "/")),
        method: method.to_string(),
    })
}

fn label_list(items: &[Value]) -> Result<Vec<RawStep>, RecordError> {
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|label| RawStep::labeled(label.trim()))
                .ok_or_else(|| RecordError::shape(format!("label is a {}", json_kind(item))))
        })
        .collect()
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
