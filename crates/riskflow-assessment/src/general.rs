use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use riskflow_core::nullable;

/// Free-form metadata about the subject of an assessment.
///
/// Every field is optional; unknown keys are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    #[serde(default)]
    pub title: Option<String>,
    /// Toxicological endpoint(s). Older files store a mapping here.
    #[serde(default)]
    pub endpoint: Option<serde_json::Value>,
    #[serde(default)]
    pub problem_formulation: Option<String>,
    #[serde(default)]
    pub uncertainty: Option<String>,
    #[serde(default)]
    pub administration_route: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub regulatory_frameworks: Option<String>,
    /// File name of a workflow table inside the assessment directory.
    #[serde(default)]
    pub workflow_custom: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub substances: Vec<Substance>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A substance under study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "cas-rn", alias = "casrn")]
    pub casrn: Option<String>,
}

impl GeneralInfo {
    /// Custom workflow file name, if one is set and not blank.
    pub fn custom_workflow(&self) -> Option<&str> {
        self.workflow_custom
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Short description of every field, for forms and templates.
    pub fn placeholders() -> serde_json::Value {
        serde_json::json!({
            "title": "Descriptive name for this study",
            "endpoint": "Toxicological endpoint(s) of interest",
            "problem_formulation": "Short description of the toxicological issue to be addressed",
            "uncertainty": "Comments about the acceptable uncertainty levels",
            "administration_route": "Administration routes of the toxicant to be considered",
            "species": "Biological species to be considered",
            "regulatory_frameworks": "Regulatory bodies for which this study can be of interest",
            "workflow_custom": "File describing the workflow. If empty the default workflow is used",
            "substances": {
                "name": "Substance name or names separated by a colon",
                "id": "Substance ID or IDs separated by a colon",
                "cas-rn": "Substance CAS-RN or CAS-RNs separated by a colon",
            }
        })
    }
}
