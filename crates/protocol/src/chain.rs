use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Role of a step inside a gadget chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// First invoked method (e.g. `__destruct`, `readObject`)
    Entry,
    /// Intermediate step
    Gadget,
    /// Final dangerous operation
    Sink,
}

impl NodeType {
    /// Position-based role: first is entry, last (of more than one) is sink.
    pub fn for_position(index: usize, len: usize) -> Self {
        if index == 0 {
            NodeType::Entry
        } else if index + 1 == len {
            NodeType::Sink
        } else {
            NodeType::Gadget
        }
    }

    /// Precedence used when the same label shows up with different roles.
    pub fn priority(self) -> u8 {
        match self {
            NodeType::Entry => 2,
            NodeType::Gadget => 1,
            NodeType::Sink => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub id: String,
    /// Full qualified signature as reported by the analyzer
    pub label: String,
    /// Short display name derived from the label
    pub short: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
}

/// Canonical linear chain: `edges[i]` always connects `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Chain {
    pub id: String,
    pub entry: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn sink(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// Checks the linear-path and positional-role invariants.
    pub fn is_well_formed(&self) -> bool {
        if self.nodes.is_empty() {
            return self.edges.is_empty();
        }
        if self.edges.len() != self.nodes.len() - 1 {
            return false;
        }
        let edges_linear = self
            .edges
            .iter()
            .enumerate()
            .all(|(i, e)| e.from == self.nodes[i].id && e.to == self.nodes[i + 1].id);
        let roles_positional = self
            .nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.node_type == NodeType::for_position(i, self.nodes.len()));
        edges_linear && roles_positional && self.entry == self.nodes[0].label
    }
}

/// Analyzer-reported location of a chain step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FilePosition {
    pub path: String,
    pub line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_follow_position() {
        assert_eq!(NodeType::for_position(0, 1), NodeType::Entry);
        assert_eq!(NodeType::for_position(0, 3), NodeType::Entry);
        assert_eq!(NodeType::for_position(1, 3), NodeType::Gadget);
        assert_eq!(NodeType::for_position(2, 3), NodeType::Sink);
    }

    #[test]
    fn node_type_serializes_under_type_key() {
        let node = Node {
            id: "n0".into(),
            label: "A#__destruct".into(),
            short: "__destruct".into(),
            node_type: NodeType::Entry,
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "entry");
    }
}
