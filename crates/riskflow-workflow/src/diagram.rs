//! Mermaid-style text diagrams of an assessment's progress through a workflow.
//!
//! Visited nodes (those with a stored result) are drawn greyed out, active
//! nodes highlighted, and the two branches behind a not-yet-answered decision
//! are previewed as future nodes. Rendering to an image is left to the
//! consumer of the text.

use std::collections::HashSet;

use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeKind};
use crate::result::NodeResult;

const ACTIVE_FILL: &str = "#BFC2F0";
const ACTIVE_STROKE: &str = "#605AA1";
const VISITED_FILL: &str = "#F5F5F5";
const VISITED_STROKE: &str = "#AEAEAD";
const FUTURE_FILL: &str = "#FADFED";
const FUTURE_STROKE: &str = "#C28FB4";

/// Id of the synthetic end marker attached to visited terminal nodes.
const END_MARKER: &str = "Z999";

/// Diagram shown while the workflow has not been entered (step 0).
pub const UNDEFINED_DIAGRAM: &str = "graph TD\n\
X[workflow undefined]-->Z[...]\n\
style X fill:#548BD4,stroke:#548BD4\n\
style Z fill:#FFFFFF,stroke:#000000\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Arrow {
    Plain,
    Yes,
    No,
}

impl Arrow {
    fn for_decision(decision: bool) -> Self {
        if decision {
            Self::Yes
        } else {
            Self::No
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "-->",
            Self::Yes => "--Y-->",
            Self::No => "--N-->",
        }
    }
}

/// Collects boxes and edges in first-mention order, without duplicates.
#[derive(Default)]
struct Builder<'g> {
    boxes: Vec<&'g Node>,
    boxed: HashSet<&'g str>,
    edges: Vec<(String, Arrow, String)>,
    edge_set: HashSet<(String, Arrow, String)>,
}

impl<'g> Builder<'g> {
    fn add_box(&mut self, node: &'g Node) {
        if self.boxed.insert(node.id.as_str()) {
            self.boxes.push(node);
        }
    }

    fn add_edge(&mut self, from: &'g Node, arrow: Arrow, to: &'g Node) {
        self.add_box(from);
        self.add_box(to);
        let edge = (from.id.clone(), arrow, to.id.clone());
        if self.edge_set.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }

    /// Show both outcomes of a decision nobody has answered yet.
    fn preview(&mut self, graph: &'g WorkflowGraph, decision: &'g Node) {
        if let NodeKind::Decision { on_true, on_false } = &decision.kind {
            for (ids, arrow) in [(on_true, Arrow::Yes), (on_false, Arrow::No)] {
                for id in ids {
                    if let Some(target) = graph.node(id) {
                        self.add_edge(decision, arrow, target);
                    }
                }
            }
        }
    }
}

/// Render the diagram for a sequence of results and the current frontier.
///
/// `results` are walked in submission order; results whose node is not part
/// of `graph` are ignored.
pub fn render(graph: &WorkflowGraph, results: &[NodeResult], active: &[String]) -> String {
    let visited: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
    let mut b = Builder::default();

    if results.is_empty() {
        b.add_box(graph.entry_node());
    }

    for result in results {
        let Some(node) = graph.node(&result.id) else {
            continue;
        };
        b.add_box(node);

        let (next, arrow): (&[String], Arrow) = match &node.kind {
            NodeKind::Task { successors } => (successors.as_slice(), Arrow::Plain),
            NodeKind::Decision { on_true, on_false } => match result.decision {
                Some(d) => {
                    let ids = if d { on_true } else { on_false };
                    (ids.as_slice(), Arrow::for_decision(d))
                }
                None => (&[][..], Arrow::Plain),
            },
            NodeKind::Terminal => (&[][..], Arrow::Plain),
        };

        for id in next {
            let Some(target) = graph.node(id) else {
                continue;
            };
            b.add_edge(node, arrow, target);
            if target.is_decision() && !visited.contains(target.id.as_str()) {
                b.preview(graph, target);
            }
        }
    }

    let mut out = String::from("graph TD\n");
    for node in &b.boxes {
        out.push_str(&format!("{}\n", node_box(node)));
    }
    for (from, arrow, to) in &b.edges {
        out.push_str(&format!("{}{}{}\n", from, arrow.as_str(), to));
    }
    let terminal_ids: Vec<&str> = b
        .boxes
        .iter()
        .filter(|n| n.is_terminal() && visited.contains(n.id.as_str()))
        .map(|n| n.id.as_str())
        .collect();
    for id in &terminal_ids {
        out.push_str(&format!("{}-->{}((end))\n", id, END_MARKER));
    }

    out.push_str(&format!("classDef vnode fill:{},stroke:{}\n", VISITED_FILL, VISITED_STROKE));
    out.push_str(&format!("classDef anode fill:{},stroke:{}\n", ACTIVE_FILL, ACTIVE_STROKE));
    out.push_str(&format!("classDef fnode fill:{},stroke:{}\n", FUTURE_FILL, FUTURE_STROKE));
    out.push_str("classDef znode fill:#FFFFFF,stroke:#000000\n");

    // Visited wins over active, active over future. Before any result the
    // entry node is the frontier.
    let entry = graph.entry_node().id.as_str();
    let mut vnodes = Vec::new();
    let mut anodes = Vec::new();
    let mut fnodes = Vec::new();
    for node in &b.boxes {
        let id = node.id.as_str();
        if visited.contains(id) {
            vnodes.push(id);
        } else if active.iter().any(|a| a == id) || (results.is_empty() && id == entry) {
            anodes.push(id);
        } else {
            fnodes.push(id);
        }
    }
    for (class, ids) in [("vnode", &vnodes), ("anode", &anodes), ("fnode", &fnodes)] {
        if !ids.is_empty() {
            out.push_str(&format!("class {} {}\n", ids.join(","), class));
        }
    }
    if !terminal_ids.is_empty() {
        out.push_str(&format!("class {} znode\n", END_MARKER));
    }
    out
}

/// Mermaid box for a node, shaped by kind.
fn node_box(node: &Node) -> String {
    let label = wrap_label(&node.name);
    match node.kind {
        NodeKind::Task { .. } => format!("{}[\"{}\"]", node.id, label),
        NodeKind::Decision { .. } => format!("{}{{\"{}\"}}", node.id, label),
        NodeKind::Terminal => format!("{}[/\"{}\"/]", node.id, label),
    }
}

/// Break a label in two at the middle word and escape quotes.
fn wrap_label(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() < 2 {
        return name.trim().replace('"', "#quot;");
    }
    let split = (words.len() + 1) / 2;
    format!("{}\\n{}", words[..split].join(" "), words[split..].join(" ")).replace('"', "#quot;")
}
