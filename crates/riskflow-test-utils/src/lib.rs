//! Workflow fixtures shared by the riskflow test suites.

use std::sync::Arc;

use riskflow_core::Result;
use riskflow_workflow::{WorkflowGraph, WorkflowSource};

/// `A` (task) -> `B` (task) -> `C` (end).
pub const LINEAR_TABLE: &str = "\
id\tlabel\tname\tcategory\tnext_node\tnext_yes\tnext_no\tdescription\tresult_type
A\tCollect\tCollect data\tTASK\tB\t\t\tGather existing studies\tvalues
B\tAnalyse\tAnalyse data\tTASK\tC\t\t\tDerive a point of departure\tvalues
C\tDone\tAssessment complete\tEND\t\t\t\t\ttext
";

/// `A` (decision) branching to the terminals `B` (yes) and `C` (no).
pub const DECISION_TABLE: &str = "\
id\tlabel\tname\tcategory\tnext_node\tnext_yes\tnext_no\tdescription\tresult_type
A\tSufficient\tIs the information sufficient?\tLOGICAL\t\tB\tC\t\tbool
B\tLow risk\tRisk characterised\tEND\t\t\t\t\ttext
C\tMore data\tMore data needed\tEND\t\t\t\t\ttext
";

/// `A` opens `B` and `C`, which both lead to the decision `D`; `D` ends in `Z`.
pub const CONVERGENT_TABLE: &str = "\
id\tlabel\tname\tcategory\tnext_node\tnext_yes\tnext_no\tdescription\tresult_type
A\tScope\tDefine scope\tTASK\tB, C\t\t\t\tvalues
B\tHazard\tHazard identification\tTASK\tD\t\t\t\tvalues
C\tExposure\tExposure estimation\tTASK\tD\t\t\t\tvalues
D\tConcern\tIs there a concern?\tLOGICAL\t\tZ\tZ\t\tbool
Z\tEnd\tAssessment complete\tEND\t\t\t\t\ttext
";

/// `A` opens the decision `B` and the task `C`. Both branches of `B` lead to
/// `D` (`yes` also opens `E`), and `C` leads to `D` as well.
pub const DIAMOND_TABLE: &str = "\
id\tlabel\tname\tcategory\tnext_node\tnext_yes\tnext_no\tdescription\tresult_type
A\tScope\tDefine scope\tTASK\tB, C\t\t\t\tvalues
B\tRead-across\tIs read-across applicable?\tLOGICAL\t\tD, E\tD\t\tbool
C\tExposure\tExposure estimation\tTASK\tD\t\t\t\tvalues
D\tCharacterise\tRisk characterisation\tTASK\tZ\t\t\t\tvalues
E\tAnalogue\tAnalogue justification\tTASK\tZ\t\t\t\tvalues
Z\tEnd\tAssessment complete\tEND\t\t\t\t\ttext
";

fn parse(table: &str) -> WorkflowGraph {
    WorkflowGraph::parse(table).expect("fixture table parses")
}

pub fn linear_graph() -> WorkflowGraph {
    parse(LINEAR_TABLE)
}

pub fn decision_graph() -> WorkflowGraph {
    parse(DECISION_TABLE)
}

pub fn convergent_graph() -> WorkflowGraph {
    parse(CONVERGENT_TABLE)
}

pub fn diamond_graph() -> WorkflowGraph {
    parse(DIAMOND_TABLE)
}

/// A workflow source that always resolves to the same graph.
///
/// Reports every custom table as missing, so assessments stay on it.
pub struct FixedWorkflow {
    graph: Arc<WorkflowGraph>,
}

impl FixedWorkflow {
    pub fn new(graph: WorkflowGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }
}

impl WorkflowSource for FixedWorkflow {
    fn resolve(&self, _name: &str) -> Result<Arc<WorkflowGraph>> {
        Ok(Arc::clone(&self.graph))
    }

    fn exists(&self, _name: &str) -> bool {
        false
    }

    fn invalidate(&self, _name: &str) {}
}

/// Write `content` to `name` inside `dir` and return the path.
pub fn write_table(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture table");
    path
}
