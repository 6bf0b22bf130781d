use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::{ResultTemplate, ResultValue};

/// The shape of answer a task expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    /// Free-text entries.
    #[serde(rename = "text")]
    Text,
    /// `{parameter, value, unit}` entries.
    #[serde(rename = "structured-values")]
    Values,
    /// A yes/no decision with a justification.
    #[serde(rename = "boolean-decision")]
    Decision,
}

impl ResultKind {
    /// Parse a `result_type` table cell. Accepts short and long spellings.
    pub fn parse(cell: &str) -> Option<Self> {
        match cell.trim().to_ascii_lowercase().as_str() {
            "text" | "report" => Some(Self::Text),
            "value" | "values" | "structured-values" => Some(Self::Values),
            "bool" | "boolean" | "decision" | "boolean-decision" => Some(Self::Decision),
            _ => None,
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Values => "structured-values",
            Self::Decision => "boolean-decision",
        };
        f.write_str(s)
    }
}

/// How a task is expected to be carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodType {
    #[default]
    Expert,
    InVitro,
    InSilico,
}

impl MethodType {
    pub fn parse(cell: &str) -> Option<Self> {
        match cell.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "expert" => Some(Self::Expert),
            "invitro" => Some(Self::InVitro),
            "insilico" => Some(Self::InSilico),
            _ => None,
        }
    }
}

/// What the end user must supply for one node, and the metadata around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Human-readable task name.
    pub name: String,
    /// Short label.
    pub label: String,
    /// Instructions shown to the assessor. Never empty.
    pub description: String,
    /// Expected result shape.
    pub result_kind: ResultKind,
    #[serde(default)]
    pub method_type: MethodType,
    /// Links to applicable methods.
    #[serde(default)]
    pub method_links: Vec<String>,
}

impl Task {
    /// Create a task. An empty description falls back to the task name.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        result_kind: ResultKind,
    ) -> Self {
        let name = name.into();
        let description = description.into();
        let description = if description.trim().is_empty() {
            name.clone()
        } else {
            description
        };
        Self {
            label: name.clone(),
            name,
            description,
            result_kind,
            method_type: MethodType::default(),
            method_links: vec![],
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_method_type(mut self, method_type: MethodType) -> Self {
        self.method_type = method_type;
        self
    }

    pub fn with_method_links(mut self, links: Vec<String>) -> Self {
        self.method_links = links;
        self
    }

    /// Empty result shell for `node_id`, shaped by `result_kind`.
    pub fn template(&self, node_id: &str) -> ResultTemplate {
        match self.result_kind {
            ResultKind::Decision => ResultTemplate::Decision {
                id: node_id.to_string(),
                decision: false,
                justification: String::new(),
                summary: String::new(),
                links: vec![],
            },
            ResultKind::Values | ResultKind::Text => ResultTemplate::Task {
                id: node_id.to_string(),
                values: Vec::<ResultValue>::new(),
                summary: String::new(),
                links: vec![],
            },
        }
    }

    /// Field-by-field guidance for the result fields relevant to this task.
    pub fn guidance(&self) -> Vec<(&'static str, &'static str)> {
        let mut fields = match self.result_kind {
            ResultKind::Decision => vec![
                ("decision", "Select yes or no to the question posed in the description"),
                ("justification", "Justification for the decision made (compulsory field)"),
            ],
            ResultKind::Values => vec![(
                "values",
                "One or many numerical parameters, each with a parameter name, a value and a unit, \
                 optionally with an uncertainty term and probability",
            )],
            ResultKind::Text => vec![(
                "values",
                "Results obtained for the tasks specified in the description, as free text entries",
            )],
        };
        fields.push((
            "summary",
            "Concise description of the results obtained or the decisions made",
        ));
        fields.push(("links", "Links to any relevant supporting document"));
        fields
    }

    /// Description bundle for the end user: what to do and what to hand back.
    pub fn describe(&self, node_id: &str) -> TaskDescription {
        TaskDescription {
            id: node_id.to_string(),
            name: self.name.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            result_kind: self.result_kind,
            method_type: self.method_type,
            method_links: self.method_links.clone(),
            guidance: self
                .guidance()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            result: self.template(node_id),
        }
    }
}

/// Serializable description of a task, including an empty result template.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDescription {
    pub id: String,
    pub name: String,
    pub label: String,
    pub description: String,
    pub result_kind: ResultKind,
    pub method_type: MethodType,
    pub method_links: Vec<String>,
    pub guidance: BTreeMap<String, String>,
    pub result: ResultTemplate,
}
