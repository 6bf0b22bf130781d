use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeKind};
use crate::task::ResultKind;

/// A result submitted for one node.
///
/// Stored by the assessment in submission order. The same struct is used on
/// the wire (submission payloads and snapshot files), so every field except
/// `id` is optional and the shape is checked against the target node with
/// [`NodeResult::check_shape`] rather than by the deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// Id of the node this result resolves.
    pub id: String,
    /// Outcome for decision nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<bool>,
    /// Why the decision was taken. Required for decision nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    /// Findings for task nodes.
    #[serde(default, deserialize_with = "riskflow_core::nullable", skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ResultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Set when the result is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Supporting documents.
    #[serde(default, deserialize_with = "riskflow_core::nullable", skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<DocumentLink>,
    /// Keys with no dedicated field (`uncertainties`, `methods`, ...), kept
    /// as submitted and written back unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One finding of a task result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Measured(Measurement),
    Text(String),
}

/// A structured `{parameter, value, unit}` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub parameter: String,
    pub value: Quantity,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<Uncertainty>,
}

/// Measured value: a number, or text for censored and ranged readings
/// such as `<10` or `2-5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl Quantity {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Qualitative and quantitative uncertainty of a measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uncertainty {
    /// Calibrated language, e.g. "Very likely (0.90-0.95)".
    pub term: String,
    /// Probability of being true, 0 to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Reference to a supporting document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    #[serde(alias = "result_name")]
    pub name: String,
    #[serde(default, alias = "result_link")]
    pub file: String,
}

/// Why a submitted result does not fit its target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeIssue {
    MissingDecision,
    MissingJustification,
    EmptyValues,
}

impl fmt::Display for ShapeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingDecision => "decision node result has no boolean decision",
            Self::MissingJustification => "decision node result has no justification",
            Self::EmptyValues => "task node result has no values",
        };
        f.write_str(s)
    }
}

impl NodeResult {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            decision: None,
            justification: None,
            values: vec![],
            summary: None,
            date: None,
            links: vec![],
            extra: BTreeMap::new(),
        }
    }

    /// A decision result.
    pub fn decision(id: impl Into<String>, decision: bool, justification: impl Into<String>) -> Self {
        Self {
            decision: Some(decision),
            justification: Some(justification.into()),
            ..Self::new(id)
        }
    }

    /// A task result with findings.
    pub fn task(id: impl Into<String>, values: Vec<ResultValue>) -> Self {
        Self {
            values,
            ..Self::new(id)
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_links(mut self, links: Vec<DocumentLink>) -> Self {
        self.links = links;
        self
    }

    /// Check the result carries the payload its node requires.
    pub fn check_shape(&self, node: &Node) -> Result<(), ShapeIssue> {
        match node.kind {
            NodeKind::Decision { .. } => {
                if self.decision.is_none() {
                    return Err(ShapeIssue::MissingDecision);
                }
                if is_blank(self.justification.as_deref()) {
                    return Err(ShapeIssue::MissingJustification);
                }
                Ok(())
            }
            NodeKind::Task { .. } => {
                let text_summary = node.task.result_kind == ResultKind::Text
                    && !is_blank(self.summary.as_deref());
                if self.values.is_empty() && !text_summary {
                    return Err(ShapeIssue::EmptyValues);
                }
                Ok(())
            }
            NodeKind::Terminal => Ok(()),
        }
    }

    /// Stamp the acceptance time.
    pub fn stamp(&mut self) {
        self.date = Some(Utc::now());
    }
}

fn is_blank(s: Option<&str>) -> bool {
    s.map_or(true, |s| s.trim().is_empty())
}

/// Empty result shell telling the caller what shape of answer is owed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultTemplate {
    Decision {
        id: String,
        decision: bool,
        justification: String,
        summary: String,
        links: Vec<DocumentLink>,
    },
    Task {
        id: String,
        values: Vec<ResultValue>,
        summary: String,
        links: Vec<DocumentLink>,
    },
    Terminal {
        id: String,
        summary: String,
        links: Vec<DocumentLink>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn task_node(kind: ResultKind) -> Node {
        Node::task("A", "Gather data", vec![]).with_task(Task::new("Gather data", "", kind))
    }

    #[test]
    fn test_parse_structured_values_with_uncertainty() {
        let yaml = r#"
id: B
values:
  - parameter: pKa
    value: 0.18
    unit: nM
    uncertainty:
      term: Very likely
      probability: 0.92
  - free text observation
summary: measured
"#;
        let result: NodeResult = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(result.values.len(), 2);
        match &result.values[0] {
            ResultValue::Measured(m) => {
                assert_eq!(m.parameter, "pKa");
                assert_eq!(m.value.as_f64(), Some(0.18));
                assert_eq!(m.unit, "nM");
                let u = m.uncertainty.as_ref().unwrap();
                assert_eq!(u.term, "Very likely");
                assert_eq!(u.probability, Some(0.92));
            }
            other => panic!("expected measurement, got {:?}", other),
        }
        assert_eq!(
            result.values[1],
            ResultValue::Text("free text observation".into())
        );
    }

    #[test]
    fn test_non_numeric_measurement_value() {
        let yaml = "id: B\nvalues:\n  - parameter: NOAEL\n    value: \"<10\"\n    unit: mg/kg\n";
        let result: NodeResult = serde_yaml::from_str(yaml).unwrap();
        match &result.values[0] {
            ResultValue::Measured(m) => {
                assert_eq!(m.value, Quantity::Text("<10".into()));
                assert_eq!(m.value.as_f64(), None);
                assert_eq!(m.value.to_string(), "<10");
            }
            other => panic!("expected measurement, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let yaml = r#"
id: A
result_type: value
values: [done]
uncertainties:
  - uncertainty: experimental SEM +/- 0.34
    term: Very likely
methods:
  - name: PCR
    sensitivity: 0.9
"#;
        let result: NodeResult = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(result.extra.len(), 3);
        assert_eq!(result.extra["methods"][0]["name"], "PCR");
        assert_eq!(result.extra["result_type"], "value");

        let out = serde_yaml::to_string(&result).unwrap();
        assert!(out.contains("uncertainties:"));
        let back: NodeResult = serde_yaml::from_str(&out).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_null_collections_are_tolerated() {
        let yaml = "id: A\nvalues: null\nlinks: null\nsummary: null\n";
        let result: NodeResult = serde_yaml::from_str(yaml).unwrap();
        assert!(result.values.is_empty());
        assert!(result.links.is_empty());
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_legacy_link_keys() {
        let yaml = "id: A\nlinks:\n  - result_name: report\n    result_link: report.pdf\n";
        let result: NodeResult = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(result.links[0].name, "report");
        assert_eq!(result.links[0].file, "report.pdf");
    }

    #[test]
    fn test_non_boolean_decision_fails_to_decode() {
        let yaml = "id: C\ndecision: maybe\n";
        assert!(serde_yaml::from_str::<NodeResult>(yaml).is_err());
    }

    #[test]
    fn test_decision_shape() {
        let node = Node::decision("C", "Sufficient?", vec![], vec![]);
        assert_eq!(
            NodeResult::new("C").check_shape(&node),
            Err(ShapeIssue::MissingDecision)
        );
        assert_eq!(
            NodeResult::decision("C", true, " ").check_shape(&node),
            Err(ShapeIssue::MissingJustification)
        );
        assert!(NodeResult::decision("C", false, "no data").check_shape(&node).is_ok());
    }

    #[test]
    fn test_task_shape() {
        let node = task_node(ResultKind::Values);
        assert_eq!(
            NodeResult::new("A").with_summary("x").check_shape(&node),
            Err(ShapeIssue::EmptyValues)
        );
        let ok = NodeResult::task("A", vec![ResultValue::Text("done".into())]);
        assert!(ok.check_shape(&node).is_ok());
    }

    #[test]
    fn test_text_task_accepts_summary_only() {
        let node = task_node(ResultKind::Text);
        assert!(NodeResult::new("A").with_summary("literature reviewed").check_shape(&node).is_ok());
        assert_eq!(
            NodeResult::new("A").check_shape(&node),
            Err(ShapeIssue::EmptyValues)
        );
    }

    #[test]
    fn test_terminal_accepts_anything() {
        let node = Node::terminal("Z", "Report");
        assert!(NodeResult::new("Z").check_shape(&node).is_ok());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let mut result = NodeResult::decision("C", true, "enough data");
        result.stamp();
        let yaml = serde_yaml::to_string(&result).unwrap();
        assert!(yaml.contains("decision: true"));
        assert!(yaml.contains("date:"));
        assert!(!yaml.contains("values"));
        let back: NodeResult = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, result);
    }
}
