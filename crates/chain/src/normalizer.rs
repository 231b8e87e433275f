use crate::format::{format_for, ChainFormat, RawChain};
use gadget_protocol::{Chain, Edge, FilePosition, Language, Node, NodeType, StorageLayout};

/// A canonical chain plus its step positions (`positions[i]` belongs to
/// `chain.nodes[i]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedChain {
    pub chain: Chain,
    pub positions: Vec<Option<FilePosition>>,
}

/// Pure `raw blob × language → chains` conversion.
///
/// Same bytes and language always give identical output: ids are positional
/// (`chain-<ordinal>`, `n<i>`), and ordinals count only emitted chains.
#[derive(Debug, Clone)]
pub struct Normalizer {
    layout: StorageLayout,
}

impl Normalizer {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn normalize(&self, raw: &str, language: Language) -> Vec<NormalizedChain> {
        let format = format_for(language);
        let records = format.records(raw, &self.layout);
        let total = records.len();

        let chains: Vec<NormalizedChain> = records
            .into_iter()
            .filter(|record| !record.steps.is_empty())
            .enumerate()
            .map(|(ordinal, record)| build_chain(ordinal, record, format))
            .collect();

        if chains.len() < total {
            log::debug!(
                "Dropped {} empty {language} chain record(s)",
                total - chains.len()
            );
        }
        chains
    }

    /// Canonical chains only, for listing and graph rendering.
    pub fn chains(&self, raw: &str, language: Language) -> Vec<Chain> {
        self.normalize(raw, language)
            .into_iter()
            .map(|normalized| normalized.chain)
            .collect()
    }
}

fn build_chain(ordinal: usize, record: RawChain, format: &dyn ChainFormat) -> NormalizedChain {
    let len = record.steps.len();
    let mut nodes = Vec::with_capacity(len);
    let mut positions = Vec::with_capacity(len);

    for (i, step) in record.steps.into_iter().enumerate() {
        let short = step
            .short
            .unwrap_or_else(|| format.short_label(&step.label));
        nodes.push(Node {
            id: node_id(i),
            label: step.label,
            short,
            node_type: NodeType::for_position(i, len),
        });
        positions.push(step.position);
    }

    let edges = (0..len.saturating_sub(1))
        .map(|i| Edge {
            from: node_id(i),
            to: node_id(i + 1),
            label: record
                .edge_labels
                .get(i)
                .cloned()
                .flatten()
                .unwrap_or_default(),
        })
        .collect();

    let entry = nodes
        .first()
        .map(|node| node.label.clone())
        .unwrap_or_default();

    NormalizedChain {
        chain: Chain {
            id: format!("chain-{ordinal}"),
            entry,
            nodes,
            edges,
        },
        positions,
    }
}

fn node_id(index: usize) -> String {
    format!("n{index}")
}
