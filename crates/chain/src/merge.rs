use gadget_protocol::{Chain, Edge, Node};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every chain of a submission folded into one graph.
///
/// Nodes are de-duplicated by full label; when a label plays several roles the
/// one with the highest priority wins (entry > gadget > sink).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl MergedGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

pub fn merge_chains(chains: &[Chain]) -> MergedGraph {
    let mut graph: DiGraph<Node, String> = DiGraph::new();
    let mut by_label: HashMap<String, NodeIndex> = HashMap::new();

    for chain in chains {
        let mut local: HashMap<&str, NodeIndex> = HashMap::with_capacity(chain.nodes.len());

        for node in &chain.nodes {
            let idx = match by_label.get(&node.label) {
                Some(&idx) => {
                    let existing = &mut graph[idx];
                    if node.node_type.priority() > existing.node_type.priority() {
                        existing.node_type = node.node_type;
                        existing.short = node.short.clone();
                    }
                    idx
                }
                None => {
                    let id = format!("m{}", graph.node_count());
                    let idx = graph.add_node(Node { id, ..node.clone() });
                    by_label.insert(node.label.clone(), idx);
                    idx
                }
            };
            local.insert(node.id.as_str(), idx);
        }

        for edge in &chain.edges {
            let (Some(&from), Some(&to)) = (local.get(edge.from.as_str()), local.get(edge.to.as_str()))
            else {
                log::debug!(
                    "Skipping edge {} -> {} of {}: unknown endpoint",
                    edge.from,
                    edge.to,
                    chain.id
                );
                continue;
            };
            graph.add_edge(from, to, edge.label.clone());
        }
    }

    let edges = graph
        .edge_references()
        .map(|e| Edge {
            from: graph[e.source()].id.clone(),
            to: graph[e.target()].id.clone(),
            label: e.weight().clone(),
        })
        .collect();
    let nodes = graph.node_indices().map(|idx| graph[idx].clone()).collect();

    MergedGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Normalizer;
    use gadget_protocol::{Language, NodeType, StorageLayout};
    use pretty_assertions::assert_eq;

    fn chains(raw: &str) -> Vec<Chain> {
        Normalizer::new(StorageLayout::new("/srv/uploads")).chains(raw, Language::Php)
    }

    #[test]
    fn shared_labels_collapse_with_role_priority() {
        let raw = concat!(
            "{\"funcStack\":[\"A#__destruct\",\"B#__toString\",\"C#eval\"]}\n",
            "{\"funcStack\":[\"B#__toString\",\"D#system\"]}\n",
        );
        let merged = merge_chains(&chains(raw));
        assert_eq!(merged.node_count(), 4);
        assert_eq!(merged.edge_count(), 3);

        let b = merged
            .nodes
            .iter()
            .find(|n| n.label == "B#__toString")
            .unwrap();
        // gadget in the first chain, entry in the second
        assert_eq!(b.node_type, NodeType::Entry);
        assert_eq!(b.id, "m1");

        let ids: Vec<_> = merged.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2", "m3"]);
        assert_eq!(merged.edges[2].from, "m1");
        assert_eq!(merged.edges[2].to, "m3");
    }

    #[test]
    fn lower_priority_role_does_not_downgrade() {
        let raw = concat!(
            "{\"funcStack\":[\"A#__destruct\",\"B#x\"]}\n",
            "{\"funcStack\":[\"Z#__wakeup\",\"A#__destruct\"]}\n",
        );
        let merged = merge_chains(&chains(raw));
        let a = merged.nodes.iter().find(|n| n.label == "A#__destruct").unwrap();
        assert_eq!(a.node_type, NodeType::Entry);
    }

    #[test]
    fn empty_input() {
        assert_eq!(merge_chains(&[]), MergedGraph::default());
    }
}
