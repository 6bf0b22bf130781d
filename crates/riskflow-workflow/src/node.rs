use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::ResultTemplate;
use crate::task::{ResultKind, Task};

/// Node category as written in the workflow table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "TASK")]
    Task,
    #[serde(rename = "LOGICAL", alias = "DECISION")]
    Decision,
    #[serde(rename = "END", alias = "TERMINAL")]
    Terminal,
}

impl Category {
    /// Parse a `category` cell. Table spelling and kind names are both accepted.
    pub fn parse(cell: &str) -> Option<Self> {
        match cell.trim().to_ascii_uppercase().as_str() {
            "TASK" => Some(Self::Task),
            "LOGICAL" | "DECISION" => Some(Self::Decision),
            "END" | "TERMINAL" => Some(Self::Terminal),
            _ => None,
        }
    }

    /// Result shape a node of this category expects when the table is silent.
    pub fn default_result_kind(self) -> ResultKind {
        match self {
            Self::Task => ResultKind::Values,
            Self::Decision => ResultKind::Decision,
            Self::Terminal => ResultKind::Text,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Task => "TASK",
            Self::Decision => "DECISION",
            Self::Terminal => "TERMINAL",
        };
        f.write_str(s)
    }
}

/// Category-specific topology. Successors are node ids, never references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "UPPERCASE")]
pub enum NodeKind {
    /// Ordinary work item with unconditional successors.
    Task { successors: Vec<String> },
    /// Yes/no question selecting one of two successor lists.
    Decision {
        on_true: Vec<String>,
        on_false: Vec<String>,
    },
    /// End of the workflow.
    Terminal,
}

/// One vertex of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, stable for the lifetime of the graph.
    pub id: String,
    pub label: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// What the assessor must supply for this node.
    pub task: Task,
}

impl Node {
    fn with_kind(id: impl Into<String>, name: impl Into<String>, kind: NodeKind, category: Category) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            label: name.clone(),
            task: Task::new(name.clone(), "", category.default_result_kind()),
            name,
            kind,
        }
    }

    /// A task node with unconditional successors.
    pub fn task(id: impl Into<String>, name: impl Into<String>, successors: Vec<String>) -> Self {
        Self::with_kind(id, name, NodeKind::Task { successors }, Category::Task)
    }

    /// A decision node with its true and false successor lists.
    pub fn decision(
        id: impl Into<String>,
        name: impl Into<String>,
        on_true: Vec<String>,
        on_false: Vec<String>,
    ) -> Self {
        Self::with_kind(
            id,
            name,
            NodeKind::Decision { on_true, on_false },
            Category::Decision,
        )
    }

    /// A terminal node.
    pub fn terminal(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(id, name, NodeKind::Terminal, Category::Terminal)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.task = task;
        self
    }

    pub fn category(&self) -> Category {
        match self.kind {
            NodeKind::Task { .. } => Category::Task,
            NodeKind::Decision { .. } => Category::Decision,
            NodeKind::Terminal => Category::Terminal,
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self.kind, NodeKind::Decision { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal)
    }

    /// Every id this node can lead to, across all successor lists.
    pub fn successor_ids(&self) -> impl Iterator<Item = &String> {
        let none: &[String] = &[];
        let (a, b) = match &self.kind {
            NodeKind::Task { successors } => (successors.as_slice(), none),
            NodeKind::Decision { on_true, on_false } => (on_true.as_slice(), on_false.as_slice()),
            NodeKind::Terminal => (none, none),
        };
        a.iter().chain(b.iter())
    }

    /// Empty result shell for this node.
    pub fn template(&self) -> ResultTemplate {
        match self.kind {
            NodeKind::Terminal => ResultTemplate::Terminal {
                id: self.id.clone(),
                summary: String::new(),
                links: vec![],
            },
            NodeKind::Decision { .. } => {
                // Decision nodes always answer with a boolean, whatever the table says.
                let mut task = self.task.clone();
                task.result_kind = ResultKind::Decision;
                task.template(&self.id)
            }
            NodeKind::Task { .. } => self.task.template(&self.id),
        }
    }
}
