use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use riskflow_core::{Result, RiskflowError, ShortId, Step};
use riskflow_workflow::diagram::{self, UNDEFINED_DIAGRAM};
use riskflow_workflow::{
    Category, NodeKind, NodeResult, ResultTemplate, TaskDescription, WorkflowGraph,
    WorkflowSource,
};

use crate::general::GeneralInfo;
use crate::notes::Note;
use crate::snapshot::{RaHeader, Snapshot};

/// The mutable record of one risk assessment.
///
/// State is `(step, active nodes, results)`. Step 0 means only the general
/// information form is editable; the first accepted `general` payload enters
/// the workflow at its entry node and moves to step 1. From then on every
/// batch of results that opens new work advances the step by one.
#[derive(Debug, Clone)]
pub struct Assessment {
    name: String,
    header: RaHeader,
    general: GeneralInfo,
    results: Vec<NodeResult>,
    notes: Vec<Note>,
    report: Option<serde_yaml::Value>,
    graph: Option<Arc<WorkflowGraph>>,
}

/// What the engine did with one submitted item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub id: String,
    #[serde(flatten)]
    pub action: ItemAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ItemAction {
    /// Stored as a new result; `opened` lists the ids added to the frontier.
    Appended { opened: Vec<String> },
    /// Replaced an existing result in place.
    Edited,
    /// Not applied.
    Skipped { reason: SkipReason, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownNode,
    Malformed,
    Empty,
    NotActive,
    DecisionImmutable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownNode => "unknown node",
            Self::Malformed => "malformed",
            Self::Empty => "empty",
            Self::NotActive => "not active",
            Self::DecisionImmutable => "decision cannot be changed",
        };
        f.write_str(s)
    }
}

/// Outcome of [`Assessment::update`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub message: String,
    /// Step after the update.
    pub step: Step,
    /// The workflow was entered by this update.
    pub initialized: bool,
    /// General information was replaced by this update.
    pub general_updated: bool,
    pub outcomes: Vec<ItemOutcome>,
}

impl UpdateReport {
    fn new(step: Step) -> Self {
        Self {
            message: "OK".to_string(),
            step,
            initialized: false,
            general_updated: false,
            outcomes: vec![],
        }
    }

    /// Whether anything was applied and the assessment needs saving.
    pub fn changed(&self) -> bool {
        self.initialized
            || self.general_updated
            || self
                .outcomes
                .iter()
                .any(|o| !matches!(o.action, ItemAction::Skipped { .. }))
    }

    pub fn appended(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, ItemAction::Appended { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, ItemAction::Skipped { .. }))
            .count()
    }
}

/// Prompt for one node of the frontier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveNodeSummary {
    pub id: String,
    pub label: String,
    pub name: String,
    pub description: String,
    pub category: Category,
}

/// A stored result together with the name of the task it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub name: Option<String>,
    #[serde(flatten)]
    pub result: NodeResult,
}

/// Task description and the result stored for it.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub task: TaskDescription,
    pub result: NodeResult,
}

#[derive(Serialize)]
struct GeneralSection<'a> {
    general: &'a GeneralInfo,
}

#[derive(Serialize)]
struct ResultSection {
    result: Vec<ResultTemplate>,
}

impl Assessment {
    /// A fresh assessment at step 0 using the named workflow table.
    pub fn new(name: impl Into<String>, workflow_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: RaHeader {
                id: Some(ShortId::new()),
                workflow_name: Some(workflow_name.into()),
                step: 0,
                active_nodes_id: vec![],
            },
            general: GeneralInfo::default(),
            results: vec![],
            notes: vec![],
            report: None,
            graph: None,
        }
    }

    /// Rebuild an assessment from a snapshot. Past step 0 the workflow graph
    /// is resolved through `source`; a graph that fails to load fails the call.
    pub fn from_snapshot(
        name: impl Into<String>,
        snapshot: Snapshot,
        source: &dyn WorkflowSource,
    ) -> Result<Self> {
        let mut assessment = Self {
            name: name.into(),
            header: snapshot.ra,
            general: snapshot.general,
            results: snapshot.results,
            notes: snapshot.notes,
            report: snapshot.assessment,
            graph: None,
        };
        if assessment.header.step > 0 {
            assessment.graph = Some(source.resolve(assessment.workflow_name()?)?);
        }
        Ok(assessment)
    }

    /// Persistable copy of the current state.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            ra: self.header.clone(),
            general: self.general.clone(),
            results: self.results.clone(),
            notes: self.notes.clone(),
            assessment: self.report.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<&ShortId> {
        self.header.id.as_ref()
    }

    pub fn step(&self) -> Step {
        self.header.step
    }

    /// The `ra` header: id, workflow, step and frontier.
    pub fn status(&self) -> &RaHeader {
        &self.header
    }

    pub fn active_nodes(&self) -> &[String] {
        &self.header.active_nodes_id
    }

    pub fn general(&self) -> &GeneralInfo {
        &self.general
    }

    /// Stored results in submission order.
    pub fn stored_results(&self) -> &[NodeResult] {
        &self.results
    }

    /// The workflow graph, once the workflow has been entered.
    pub fn graph(&self) -> Option<&WorkflowGraph> {
        self.graph.as_deref()
    }

    fn workflow_name(&self) -> Result<&str> {
        self.header.workflow_name.as_deref().ok_or_else(|| {
            RiskflowError::NotFound(format!("workflow table for risk assessment '{}'", self.name))
        })
    }

    fn require_graph(&self) -> Result<Arc<WorkflowGraph>> {
        self.graph.clone().ok_or_else(|| {
            RiskflowError::InvalidInput(format!(
                "risk assessment '{}' has not entered its workflow yet",
                self.name
            ))
        })
    }

    /// Point the assessment at another workflow table. Only allowed at step 0.
    pub fn set_custom_workflow(&mut self, file_name: &str) -> Result<()> {
        if self.header.step > 0 {
            return Err(RiskflowError::InvalidInput(
                "the workflow can only be replaced before it is entered (step 0)".into(),
            ));
        }
        self.header.workflow_name = Some(file_name.to_string());
        self.general.workflow_custom = Some(file_name.to_string());
        Ok(())
    }

    /// Apply a submission payload.
    ///
    /// At step 0 the payload must carry `general`. Past step 0 it may carry
    /// `general` (replaced in place), `result` (a list of results), or both.
    pub fn update(&mut self, payload: &Value, source: &dyn WorkflowSource) -> Result<UpdateReport> {
        let section = |key: &str| payload.get(key).filter(|v| !v.is_null());

        if self.header.step == 0 {
            let general = section("general").ok_or_else(|| {
                RiskflowError::InvalidInput("no \"general\" section in input".into())
            })?;
            return self.initialize(general, source);
        }

        let general = section("general");
        let results = payload.get("result");
        if general.is_none() && results.is_none() {
            return Err(RiskflowError::UpdateRejected(
                "input has no \"result\" or \"general\" section".into(),
            ));
        }

        let mut report = UpdateReport::new(self.header.step);
        if let Some(general) = general {
            self.general = parse_general(general)?;
            report.general_updated = true;
            info!(ra = %self.name, "General information updated");
        }
        if let Some(results) = results {
            self.submit(results, &mut report)?;
        }
        report.step = self.header.step;
        Ok(report)
    }

    /// Enter the workflow: resolve the graph, open the entry node, move to step 1.
    fn initialize(&mut self, general: &Value, source: &dyn WorkflowSource) -> Result<UpdateReport> {
        let general = parse_general(general)?;

        let mut workflow = self.workflow_name()?.to_string();
        if let Some(custom) = general.custom_workflow() {
            if source.exists(custom) {
                source.invalidate(custom);
                workflow = custom.to_string();
                info!(ra = %self.name, workflow = %custom, "Workflow name updated");
            } else {
                warn!(ra = %self.name, workflow = %custom, "Custom workflow not found, keeping current");
            }
        }

        let graph = source.resolve(&workflow)?;
        let entry = graph.entry_node().id.clone();

        self.header.workflow_name = Some(workflow);
        self.general = general;
        self.header.active_nodes_id = vec![entry];
        self.header.step = 1;
        self.graph = Some(graph);
        info!(ra = %self.name, active = ?self.header.active_nodes_id, step = 1, "Workflow entered");

        let mut report = UpdateReport::new(1);
        report.initialized = true;
        report.general_updated = true;
        Ok(report)
    }

    /// Process a batch of results. Bad items are skipped, never fatal.
    fn submit(&mut self, items: &Value, report: &mut UpdateReport) -> Result<()> {
        let items: &[Value] = match items {
            Value::Null => &[],
            Value::Array(items) => items.as_slice(),
            _ => {
                return Err(RiskflowError::InvalidInput(
                    "\"result\" must be a list".into(),
                ))
            }
        };
        let graph = self.require_graph()?;
        let mut advanced = false;

        for item in items {
            let outcome = self.submit_one(&graph, item)?;
            if let ItemAction::Skipped { reason, detail } = &outcome.action {
                warn!(ra = %self.name, node_id = %outcome.id, %reason, detail = %detail, "Result ignored");
            }
            advanced |= matches!(outcome.action, ItemAction::Appended { .. });
            report.outcomes.push(outcome);
        }

        if advanced {
            self.header.step += 1;
            info!(ra = %self.name, step = self.header.step, "Workflow advanced");
        }
        Ok(())
    }

    fn submit_one(&mut self, graph: &WorkflowGraph, item: &Value) -> Result<ItemOutcome> {
        let id = item
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let skip = |id: String, reason: SkipReason, detail: String| ItemOutcome {
            id,
            action: ItemAction::Skipped { reason, detail },
        };

        let Some(node) = graph.node(&id) else {
            return Ok(skip(id, SkipReason::UnknownNode, "node not in workflow".into()));
        };

        let mut result: NodeResult = match serde_json::from_value(item.clone()) {
            Ok(r) => r,
            Err(e) => return Ok(skip(id, SkipReason::Malformed, e.to_string())),
        };
        if let Err(issue) = result.check_shape(node) {
            return Ok(skip(id, SkipReason::Empty, issue.to_string()));
        }

        if let Some(pos) = self.header.active_nodes_id.iter().position(|a| *a == id) {
            let next: Vec<String> = match &node.kind {
                NodeKind::Task { .. } => graph.successors(&id)?.to_vec(),
                NodeKind::Decision { .. } => {
                    // check_shape guarantees a decision is present.
                    let decision = result.decision.unwrap_or_default();
                    graph.branch(&id, decision)?.to_vec()
                }
                NodeKind::Terminal => vec![],
            };

            result.stamp();
            self.results.push(result);
            self.header.active_nodes_id.remove(pos);

            let visited: HashSet<&str> = self.results.iter().map(|r| r.id.as_str()).collect();
            let mut opened = Vec::new();
            for next_id in next {
                if visited.contains(next_id.as_str())
                    || self.header.active_nodes_id.contains(&next_id)
                {
                    debug!(node_id = %next_id, "Already visited or active, not reopened");
                    continue;
                }
                self.header.active_nodes_id.push(next_id.clone());
                opened.push(next_id);
            }
            info!(
                ra = %self.name,
                node_id = %id,
                active = ?self.header.active_nodes_id,
                "Result appended"
            );
            return Ok(ItemOutcome {
                id,
                action: ItemAction::Appended { opened },
            });
        }

        let Some(existing) = self.results.iter_mut().find(|r| r.id == id) else {
            return Ok(skip(id, SkipReason::NotActive, "node is not active".into()));
        };

        if node.is_decision() && existing.decision.is_some() && existing.decision != result.decision {
            return Ok(skip(
                id,
                SkipReason::DecisionImmutable,
                format!(
                    "recorded decision {:?} kept",
                    existing.decision.unwrap_or_default()
                ),
            ));
        }

        result.stamp();
        *existing = result;
        info!(ra = %self.name, node_id = %id, "Result edited");
        Ok(ItemOutcome {
            id,
            action: ItemAction::Edited,
        })
    }

    /// Label, name and description of every active node.
    pub fn active_node_summaries(&self) -> Vec<ActiveNodeSummary> {
        let Some(graph) = self.graph() else {
            return vec![];
        };
        self.header
            .active_nodes_id
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|node| ActiveNodeSummary {
                id: node.id.clone(),
                label: node.label.clone(),
                name: node.task.name.clone(),
                description: node.task.description.clone(),
                category: node.category(),
            })
            .collect()
    }

    /// Full task description of an active node, with an empty result template.
    pub fn active_node(&self, id: &str) -> Option<TaskDescription> {
        if !self.header.active_nodes_id.iter().any(|a| a == id) {
            return None;
        }
        let node = self.graph()?.node(id)?;
        let mut description = node.task.describe(&node.id);
        description.result = node.template();
        Some(description)
    }

    /// Stored results with task names, in submission order.
    pub fn results(&self) -> Vec<ResultView> {
        self.results.iter().map(|r| self.view(r)).collect()
    }

    pub fn result(&self, id: &str) -> Option<ResultView> {
        self.results.iter().find(|r| r.id == id).map(|r| self.view(r))
    }

    fn view(&self, result: &NodeResult) -> ResultView {
        ResultView {
            name: self
                .graph()
                .and_then(|g| g.task_name(&result.id))
                .map(str::to_string),
            result: result.clone(),
        }
    }

    /// Task description of an answered node together with its stored result.
    pub fn task_view(&self, id: &str) -> Option<TaskView> {
        let node = self.graph()?.node(id)?;
        let result = self.results.iter().find(|r| r.id == id)?.clone();
        let mut task = node.task.describe(&node.id);
        task.result = node.template();
        Some(TaskView { task, result })
    }

    /// Results of every answered node upstream of a decision node.
    ///
    /// Returned in submission order.
    pub fn ancestor_results(&self, node_id: &str) -> Result<Vec<NodeResult>> {
        let graph = self.require_graph()?;
        let node = graph.get_node(node_id)?;
        if !node.is_decision() {
            return Err(RiskflowError::WrongNodeKind {
                node: node_id.to_string(),
                expected: Category::Decision.to_string(),
                actual: node.category().to_string(),
            });
        }
        let upstream: HashSet<String> = graph.ancestors(node_id)?.into_iter().collect();
        Ok(self
            .results
            .iter()
            .filter(|r| upstream.contains(&r.id))
            .cloned()
            .collect())
    }

    /// YAML template of the input still owed at the current step.
    pub fn template(&self) -> Result<String> {
        let mut out = format!("# template for step {}\n", self.header.step);
        if self.header.step == 0 {
            out.push_str(&serde_yaml::to_string(&GeneralSection {
                general: &self.general,
            })?);
            return Ok(out);
        }

        let graph = self.require_graph()?;
        out.push_str("# input needed for the following nodes\n");
        let mut templates = Vec::new();
        for id in &self.header.active_nodes_id {
            let node = graph.get_node(id)?;
            out.push_str(&format!("# node {}\n", node.name));
            templates.push(node.template());
        }
        out.push_str(&serde_yaml::to_string(&ResultSection { result: templates })?);
        Ok(out)
    }

    /// Mermaid-style diagram of the progress so far.
    pub fn diagram(&self) -> String {
        match self.graph() {
            Some(graph) if self.header.step > 0 => {
                diagram::render(graph, &self.results, &self.header.active_nodes_id)
            }
            _ => UNDEFINED_DIAGRAM.to_string(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id.as_str() == id)
    }

    /// Attach a note. Never changes the step.
    pub fn add_note(
        &mut self,
        title: impl Into<String>,
        text: impl Into<String>,
        author: impl Into<String>,
    ) -> ShortId {
        let note = Note::new(title, text, author);
        let id = note.id.clone();
        debug!(ra = %self.name, note_id = %id, "Note added");
        self.notes.push(note);
        id
    }

    pub fn remove_note(&mut self, id: &str) -> Result<Note> {
        let pos = self
            .notes
            .iter()
            .position(|n| n.id.as_str() == id)
            .ok_or_else(|| RiskflowError::NotFound(format!("note '{}'", id)))?;
        Ok(self.notes.remove(pos))
    }
}

fn parse_general(value: &Value) -> Result<GeneralInfo> {
    serde_json::from_value(value.clone())
        .map_err(|e| RiskflowError::InvalidInput(format!("general section: {}", e)))
}
