use std::collections::HashMap;
use std::path::Path;

use riskflow_core::{Result, RiskflowError};

/// Columns every workflow table must carry, with accepted alternative headers.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("id", &[]),
    ("label", &[]),
    ("name", &[]),
    ("category", &[]),
    ("next_node", &[]),
    ("next_yes", &["next_true"]),
    ("next_no", &["next_false"]),
];

/// One parsed row of a workflow table, before any graph validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub id: String,
    pub label: String,
    pub name: String,
    /// Raw category cell.
    pub category: String,
    pub next_node: Vec<String>,
    pub next_yes: Vec<String>,
    pub next_no: Vec<String>,
    pub description: Option<String>,
    pub result_type: Option<String>,
    pub method_type: Option<String>,
    pub method_link: Vec<String>,
}

/// A tab-delimited workflow definition, rows kept in file order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowTable {
    pub rows: Vec<TableRow>,
}

impl WorkflowTable {
    /// Read and parse a table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RiskflowError::NotFound(format!("workflow table {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Parse table text. The first non-blank line is the header.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| RiskflowError::MalformedGraph("workflow table is empty".into()))?;
        let columns: HashMap<String, usize> = header
            .split('\t')
            .enumerate()
            .map(|(i, h)| (clean_cell(h).to_ascii_lowercase(), i))
            .collect();

        let mut index = HashMap::new();
        for (name, aliases) in REQUIRED_COLUMNS {
            let found = std::iter::once(name)
                .chain(aliases.iter())
                .find_map(|c| columns.get(*c).copied());
            match found {
                Some(i) => {
                    index.insert(*name, i);
                }
                None => {
                    return Err(RiskflowError::MalformedGraph(format!(
                        "workflow table lacks mandatory column '{}'",
                        name
                    )))
                }
            }
        }
        let optional = |name: &str| columns.get(name).copied();
        let description = optional("description");
        let result_type = optional("result_type");
        let method_type = optional("method_type");
        let method_link = optional("method_link");

        let mut rows = Vec::new();
        for line in lines {
            let cells: Vec<&str> = line.split('\t').collect();
            let cell = |i: usize| cells.get(i).map(|c| clean_cell(*c)).unwrap_or("");
            let opt_cell = |i: Option<usize>| {
                i.map(cell)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
            };

            rows.push(TableRow {
                id: cell(index["id"]).to_string(),
                label: cell(index["label"]).to_string(),
                name: cell(index["name"]).to_string(),
                category: cell(index["category"]).to_string(),
                next_node: id_list(cell(index["next_node"])),
                next_yes: id_list(cell(index["next_yes"])),
                next_no: id_list(cell(index["next_no"])),
                description: opt_cell(description),
                result_type: opt_cell(result_type),
                method_type: opt_cell(method_type),
                method_link: method_link.map(|i| link_list(cell(i))).unwrap_or_default(),
            });
        }

        if rows.is_empty() {
            return Err(RiskflowError::MalformedGraph(
                "workflow table has no node rows".into(),
            ));
        }
        Ok(Self { rows })
    }
}

/// Trim whitespace and one pair of surrounding double quotes.
fn clean_cell(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(cell)
        .trim()
}

/// Split a comma-separated id list. Spaces inside ids are removed.
fn id_list(cell: &str) -> Vec<String> {
    cell.replace(' ', "")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn link_list(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
