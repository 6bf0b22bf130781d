//! Workflow graph model.
//!
//! A workflow is a flat, id-keyed set of `Node`s built once from a
//! tab-delimited table. Each node owns a `Task` describing what the assessor
//! must supply; the answers themselves (`NodeResult`) are stored by the
//! assessment, never by the graph. Nodes refer to their successors by id, so
//! the graph is the sole owner of every node and can be shared read-only
//! behind an `Arc` through the `GraphCache`.

pub mod cache;
pub mod diagram;
pub mod graph;
pub mod node;
pub mod result;
pub mod table;
pub mod task;

pub use cache::{GraphCache, WorkflowSource};
pub use graph::WorkflowGraph;
pub use node::{Category, Node, NodeKind};
pub use result::{
    DocumentLink, Measurement, NodeResult, Quantity, ResultTemplate, ResultValue, ShapeIssue,
    Uncertainty,
};
pub use table::{TableRow, WorkflowTable};
pub use task::{MethodType, ResultKind, Task, TaskDescription};

/// Workflow table seeded into new assessments when no custom default is configured.
pub const DEFAULT_WORKFLOW_TABLE: &str = include_str!("default_workflow.tsv");
