use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

use riskflow_core::{Result, RiskflowError};

use crate::node::{Category, Node, NodeKind};
use crate::table::{TableRow, WorkflowTable};
use crate::task::{MethodType, ResultKind, Task};

/// An immutable workflow graph.
///
/// Nodes live in an id-keyed map and refer to each other by id. The first
/// node of the definition is the entry node. Once built the graph is never
/// mutated; share it behind an `Arc` (see [`crate::GraphCache`]).
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    nodes: HashMap<String, Node>,
    /// Node ids in definition order.
    order: Vec<String>,
    entry: String,
}

impl WorkflowGraph {
    /// Read a tab-delimited workflow table and build the graph from it.
    pub fn load(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Importing workflow table");
        let table = WorkflowTable::load(path)?;
        Self::from_table(&table)
    }

    /// Build a graph from table text.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_table(&WorkflowTable::parse(text)?)
    }

    /// Build a graph from parsed table rows. The first row is the entry node.
    pub fn from_table(table: &WorkflowTable) -> Result<Self> {
        let nodes = table
            .rows
            .iter()
            .map(node_from_row)
            .collect::<Result<Vec<_>>>()?;
        Self::from_nodes(nodes)
    }

    /// Build a graph from nodes. The first node is the entry node.
    ///
    /// Fails with `MalformedGraph` on empty input, duplicate or empty ids, and
    /// successor ids that do not name a node of the graph.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        let entry = nodes
            .first()
            .map(|n| n.id.clone())
            .ok_or_else(|| RiskflowError::MalformedGraph("workflow has no nodes".into()))?;

        let mut order = Vec::with_capacity(nodes.len());
        let mut map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if node.id.is_empty() {
                return Err(RiskflowError::MalformedGraph(
                    "node with an empty id".into(),
                ));
            }
            if map.contains_key(&node.id) {
                return Err(RiskflowError::MalformedGraph(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            order.push(node.id.clone());
            map.insert(node.id.clone(), node);
        }

        for id in &order {
            let node = &map[id];
            if let Some(missing) = node.successor_ids().find(|s| !map.contains_key(*s)) {
                return Err(RiskflowError::MalformedGraph(format!(
                    "node '{}' references unknown node '{}'",
                    id, missing
                )));
            }
        }

        debug!(nodes = order.len(), entry = %entry, "Workflow graph built");
        Ok(Self {
            nodes: map,
            order,
            entry,
        })
    }

    /// Look up a node by id.
    pub fn get_node(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| RiskflowError::NotFound(format!("node '{}'", id)))
    }

    /// Look up a node by id, `None` if absent.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// The node defined by the first table row.
    pub fn entry_node(&self) -> &Node {
        &self.nodes[&self.entry]
    }

    /// Unconditional successors of a task node. Terminal nodes have none.
    pub fn successors(&self, id: &str) -> Result<&[String]> {
        let node = self.get_node(id)?;
        match &node.kind {
            NodeKind::Task { successors } => Ok(successors.as_slice()),
            NodeKind::Terminal => Ok(&[][..]),
            NodeKind::Decision { .. } => Err(wrong_kind(node, Category::Task)),
        }
    }

    /// Successors of a decision node for the given outcome.
    pub fn branch(&self, id: &str, decision: bool) -> Result<&[String]> {
        let node = self.get_node(id)?;
        match &node.kind {
            NodeKind::Decision { on_true, on_false } => {
                Ok(if decision { on_true.as_slice() } else { on_false.as_slice() })
            }
            _ => Err(wrong_kind(node, Category::Decision)),
        }
    }

    /// Every node from which `id` can be reached, excluding `id` itself.
    ///
    /// Scans the successor lists of every node for each discovered ancestor;
    /// there is no reverse index. Ids come back in discovery order, each
    /// level in definition order. Safe on cyclic definitions.
    pub fn ancestors(&self, id: &str) -> Result<Vec<String>> {
        self.get_node(id)?;

        let mut found: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut cursor = 0;
        let mut target = id.to_string();

        loop {
            for candidate in &self.order {
                if seen.contains(candidate.as_str()) {
                    continue;
                }
                if self.nodes[candidate].successor_ids().any(|s| *s == target) {
                    seen.insert(candidate.as_str());
                    found.push(candidate.clone());
                }
            }
            match found.get(cursor) {
                Some(next) => {
                    target = next.clone();
                    cursor += 1;
                }
                None => break,
            }
        }
        Ok(found)
    }

    /// Nodes in definition order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Task name of a node, if the node exists.
    pub fn task_name(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.task.name.as_str())
    }
}

fn wrong_kind(node: &Node, expected: Category) -> RiskflowError {
    RiskflowError::WrongNodeKind {
        node: node.id.clone(),
        expected: expected.to_string(),
        actual: node.category().to_string(),
    }
}

/// Turn a table row into a node, enforcing the successor invariants of its kind.
fn node_from_row(row: &TableRow) -> Result<Node> {
    let malformed = |what: &str| {
        RiskflowError::MalformedGraph(format!("row '{}': {}", row.id, what))
    };

    let category = Category::parse(&row.category)
        .ok_or_else(|| malformed(&format!("unknown category '{}'", row.category)))?;

    let kind = match category {
        Category::Task => {
            if !row.next_yes.is_empty() || !row.next_no.is_empty() {
                return Err(malformed("TASK node with decision successors"));
            }
            NodeKind::Task {
                successors: row.next_node.clone(),
            }
        }
        Category::Decision => {
            if !row.next_node.is_empty() {
                return Err(malformed("decision node with unconditional successors"));
            }
            NodeKind::Decision {
                on_true: row.next_yes.clone(),
                on_false: row.next_no.clone(),
            }
        }
        Category::Terminal => {
            if !(row.next_node.is_empty() && row.next_yes.is_empty() && row.next_no.is_empty()) {
                return Err(malformed("terminal node with successors"));
            }
            NodeKind::Terminal
        }
    };

    let result_kind = match row.result_type.as_deref() {
        None => category.default_result_kind(),
        Some(cell) => ResultKind::parse(cell).unwrap_or_else(|| {
            warn!(node_id = %row.id, result_type = %cell, "Unknown result type, using category default");
            category.default_result_kind()
        }),
    };
    let method_type = match row.method_type.as_deref() {
        None => MethodType::default(),
        Some(cell) => MethodType::parse(cell).unwrap_or_else(|| {
            warn!(node_id = %row.id, method_type = %cell, "Unknown method type, using expert");
            MethodType::default()
        }),
    };

    let label = if row.label.is_empty() {
        row.name.clone()
    } else {
        row.label.clone()
    };
    let task = Task::new(
        row.name.clone(),
        row.description.clone().unwrap_or_default(),
        result_kind,
    )
    .with_label(label.clone())
    .with_method_type(method_type)
    .with_method_links(row.method_link.clone());

    Ok(Node {
        id: row.id.clone(),
        label,
        name: row.name.clone(),
        kind,
        task,
    })
}
