use std::path::Path;

use serde::{Deserialize, Serialize};

use riskflow_core::{nullable, Result, ShortId, Step};
use riskflow_workflow::NodeResult;

use crate::general::GeneralInfo;
use crate::notes::Note;

/// The `ra` section of a snapshot: identity, workflow and progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaHeader {
    #[serde(rename = "ID", default)]
    pub id: Option<ShortId>,
    /// File name of the workflow table inside the assessment directory.
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub step: Step,
    /// Ids awaiting a result, in the order they were opened.
    #[serde(default, deserialize_with = "nullable")]
    pub active_nodes_id: Vec<String>,
}

/// Full persisted state of one assessment at one step.
///
/// Any top-level key may be missing or `null` in files written by older
/// versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "nullable")]
    pub ra: RaHeader,
    #[serde(default, deserialize_with = "nullable")]
    pub general: GeneralInfo,
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<NodeResult>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Vec<Note>,
    /// Opaque report section written by external tools; carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<serde_yaml::Value>,
}

impl Snapshot {
    pub fn step(&self) -> Step {
        self.ra.step
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
