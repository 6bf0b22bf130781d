use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use riskflow_core::Result;

use crate::graph::WorkflowGraph;

/// Resolves workflow table names to parsed graphs.
///
/// Names are file names relative to the assessment directory. Implementations
/// are expected to cache parsed graphs.
pub trait WorkflowSource {
    /// Parsed graph for the named table.
    fn resolve(&self, name: &str) -> Result<Arc<WorkflowGraph>>;

    /// Whether a table of that name exists.
    fn exists(&self, name: &str) -> bool;

    /// Forget any cached graph for the named table.
    fn invalidate(&self, name: &str);
}

/// Process-wide cache of parsed workflow graphs, keyed by table path.
///
/// Graphs are immutable, so every assessment using the same table shares one
/// `Arc`. Replacing a table on disk requires [`GraphCache::invalidate`] before
/// the next load.
pub struct GraphCache {
    graphs: Mutex<HashMap<PathBuf, Arc<WorkflowGraph>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self {
            graphs: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached graph for `path`, parsing the table on first use.
    ///
    /// A table that fails to parse is not cached.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<WorkflowGraph>> {
        if let Some(graph) = self.lock().get(path) {
            return Ok(Arc::clone(graph));
        }

        let graph = Arc::new(WorkflowGraph::load(path)?);
        self.lock().insert(path.to_path_buf(), Arc::clone(&graph));
        debug!(path = %path.display(), "Workflow graph cached");
        Ok(graph)
    }

    /// Drop the cached graph for `path`. Returns whether one was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        let removed = self.lock().remove(path).is_some();
        if removed {
            debug!(path = %path.display(), "Workflow graph invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<WorkflowGraph>>> {
        self.graphs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new()
    }
}
