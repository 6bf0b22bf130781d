use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

use riskflow_core::{RepositoryConfig, Result, RiskflowError, Step};
use riskflow_workflow::{GraphCache, WorkflowGraph, WorkflowSource, DEFAULT_WORKFLOW_TABLE};

use crate::assessment::{Assessment, UpdateReport};
use crate::store::SnapshotStore;

const HISTORY_DIR: &str = "hist";
const REPO_DIR: &str = "repo";
const ARCHIVE_EXT: &str = "tgz";

/// All assessments under one repository root.
///
/// Holds the graph cache, so keep one `Repository` per process and pass it
/// around rather than building a new one per call.
pub struct Repository {
    config: RepositoryConfig,
    cache: GraphCache,
}

/// Resolves workflow tables inside one assessment directory through the cache.
struct DirWorkflows<'a> {
    dir: PathBuf,
    cache: &'a GraphCache,
}

impl DirWorkflows<'_> {
    fn path(&self, name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(RiskflowError::InvalidInput(format!(
                "workflow '{}' must be a file name inside the assessment directory",
                name
            )));
        }
        Ok(self.dir.join(name))
    }
}

impl WorkflowSource for DirWorkflows<'_> {
    fn resolve(&self, name: &str) -> Result<Arc<WorkflowGraph>> {
        self.cache.get_or_load(&self.path(name)?)
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn invalidate(&self, name: &str) {
        if let Ok(path) = self.path(name) {
            self.cache.invalidate(&path);
        }
    }
}

impl Repository {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            config,
            cache: GraphCache::new(),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }

    /// Directory of the named assessment.
    pub fn dir(&self, name: &str) -> PathBuf {
        self.config.assessment_dir(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        is_plain_file_name(name) && self.store(name).exists()
    }

    fn store(&self, name: &str) -> SnapshotStore {
        SnapshotStore::new(self.dir(name))
    }

    fn workflows(&self, name: &str) -> DirWorkflows<'_> {
        DirWorkflows {
            dir: self.dir(name),
            cache: &self.cache,
        }
    }

    fn require(&self, name: &str) -> Result<SnapshotStore> {
        if !self.exists(name) {
            return Err(RiskflowError::NotFound(format!("risk assessment '{}'", name)));
        }
        Ok(self.store(name))
    }

    /// Create a new assessment at step 0.
    ///
    /// Seeds the directory with the configured default workflow table (or the
    /// built-in one) and an initial snapshot carrying a generated ID.
    pub fn create(&self, name: &str) -> Result<Assessment> {
        if !is_plain_file_name(name) {
            return Err(RiskflowError::InvalidInput(format!(
                "invalid risk assessment name '{}'",
                name
            )));
        }
        let dir = self.dir(name);
        if dir.exists() {
            return Err(RiskflowError::AlreadyExists(name.to_string()));
        }

        fs::create_dir_all(dir.join(HISTORY_DIR))?;
        fs::create_dir_all(dir.join(REPO_DIR))?;

        let table = dir.join(&self.config.workflow_file);
        match self.config.default_workflow_path() {
            Some(source) => {
                fs::copy(&source, &table).map_err(|e| {
                    RiskflowError::NotFound(format!(
                        "default workflow {}: {}",
                        source.display(),
                        e
                    ))
                })?;
            }
            None => fs::write(&table, DEFAULT_WORKFLOW_TABLE)?,
        }

        let assessment = Assessment::new(name, self.config.workflow_file.clone());
        self.store(name).save(&assessment.to_snapshot())?;
        info!(ra = %name, path = %dir.display(), "Risk assessment created");
        Ok(assessment)
    }

    /// Names of every assessment, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let root = self.config.assessments_dir();
        if !root.is_dir() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(&root)?
            .filter_map(|entry| entry.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| self.store(n).exists())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load an assessment, at its current step or at a past one.
    pub fn load(&self, name: &str, step: Option<Step>) -> Result<Assessment> {
        let snapshot = self.require(name)?.load(step)?;
        Assessment::from_snapshot(name, snapshot, &self.workflows(name))
    }

    /// Apply a submission payload to the current state and persist it once.
    pub fn update(&self, name: &str, payload: &serde_json::Value) -> Result<UpdateReport> {
        let store = self.require(name)?;
        let workflows = self.workflows(name);
        let mut assessment = Assessment::from_snapshot(name, store.load_current()?, &workflows)?;

        let report = assessment.update(payload, &workflows)?;
        if report.changed() {
            store.save(&assessment.to_snapshot())?;
        } else {
            info!(ra = %name, "Nothing applied, snapshot not written");
        }
        Ok(report)
    }

    /// Run `f` against the current state and persist the result.
    pub fn modify<T>(&self, name: &str, f: impl FnOnce(&mut Assessment) -> Result<T>) -> Result<T> {
        let store = self.require(name)?;
        let mut assessment =
            Assessment::from_snapshot(name, store.load_current()?, &self.workflows(name))?;
        let out = f(&mut assessment)?;
        store.save(&assessment.to_snapshot())?;
        Ok(out)
    }

    /// Delete an assessment and its whole history.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.require(name)?;
        let dir = self.dir(name);
        self.cache.invalidate(&dir.join(&self.config.workflow_file));
        fs::remove_dir_all(&dir)?;
        info!(ra = %name, "Risk assessment removed");
        Ok(())
    }

    /// Roll the assessment back by one step.
    pub fn drop_last_step(&self, name: &str) -> Result<Assessment> {
        let snapshot = self.require(name)?.drop_last_step()?;
        Assessment::from_snapshot(name, snapshot, &self.workflows(name))
    }

    /// Roll back a specific step, which must be the last one.
    pub fn drop_step(&self, name: &str, step: Step) -> Result<Assessment> {
        let last = self.require(name)?.load_current()?.step();
        if step != last {
            return Err(RiskflowError::NotLastStep {
                requested: step,
                last,
            });
        }
        self.drop_last_step(name)
    }

    /// Steps with a recorded snapshot.
    pub fn steps(&self, name: &str) -> Result<Vec<Step>> {
        self.require(name)?.steps()
    }

    /// Copy a workflow table into the assessment and make it the assessment's
    /// workflow. Only allowed before the workflow is entered.
    pub fn set_custom_workflow(&self, name: &str, table: &Path) -> Result<()> {
        let file_name = table
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RiskflowError::InvalidInput(format!("not a file: {}", table.display()))
            })?;

        // Refuse broken tables before touching the assessment.
        WorkflowGraph::load(table)?;

        let dest = self.dir(name).join(&file_name);
        self.modify(name, |assessment| {
            assessment.set_custom_workflow(&file_name)?;
            if table != dest {
                fs::copy(table, &dest)?;
            }
            Ok(())
        })?;
        self.cache.invalidate(&dest);
        info!(ra = %name, workflow = %file_name, "Custom workflow installed");
        Ok(())
    }

    /// Diagram of the assessment at its current or a past step.
    pub fn diagram(&self, name: &str, step: Option<Step>) -> Result<String> {
        Ok(self.load(name, step)?.diagram())
    }

    /// Template of the input still owed at the current step.
    pub fn template(&self, name: &str) -> Result<String> {
        self.load(name, None)?.template()
    }

    /// Pack the assessment directory into `<root>/<name>.tgz`.
    pub fn export(&self, name: &str) -> Result<PathBuf> {
        let dest = self.config.root_dir().join(format!("{}.{}", name, ARCHIVE_EXT));
        self.export_to(name, &dest)?;
        Ok(dest)
    }

    /// Pack the assessment directory, history included, into a gzipped tar
    /// whose entries all live under `<name>/`.
    pub fn export_to(&self, name: &str, dest: &Path) -> Result<()> {
        self.require(name)?;
        let file = File::create(dest)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.append_dir_all(name, self.dir(name))?;
        builder.into_inner()?.finish()?;
        info!(ra = %name, path = %dest.display(), "Risk assessment exported");
        Ok(())
    }

    /// Unpack an exported archive into the repository. The assessment name is
    /// the archive's file name without `.tgz`; an existing assessment of that
    /// name is never overwritten.
    pub fn import(&self, archive: &Path) -> Result<String> {
        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".tgz").or_else(|| n.strip_suffix(".tar.gz")))
            .filter(|n| is_plain_file_name(n))
            .map(str::to_string)
            .ok_or_else(|| {
                RiskflowError::InvalidInput(format!(
                    "not a risk assessment archive: {}",
                    archive.display()
                ))
            })?;
        let dir = self.dir(&name);
        if dir.exists() {
            return Err(RiskflowError::AlreadyExists(name));
        }

        let ras = self.config.assessments_dir();
        fs::create_dir_all(&ras)?;
        let unpacked = unpack(archive, &name, &ras).and_then(|()| {
            if self.store(&name).exists() {
                Ok(())
            } else {
                Err(RiskflowError::InvalidInput(format!(
                    "{} holds no risk assessment",
                    archive.display()
                )))
            }
        });
        if let Err(e) = unpacked {
            if dir.exists() {
                fs::remove_dir_all(&dir).ok();
            }
            return Err(e);
        }
        info!(ra = %name, path = %archive.display(), "Risk assessment imported");
        Ok(name)
    }

    /// Check that every assessment loads. Returns the names that fail with their errors.
    pub fn verify(&self) -> Result<Vec<(String, RiskflowError)>> {
        let mut failures = Vec::new();
        for name in self.list()? {
            if let Err(e) = self.load(&name, None) {
                warn!(ra = %name, error = %e, "Risk assessment does not load");
                failures.push((name, e));
            }
        }
        Ok(failures)
    }
}

/// Extract `archive` into `ras`, refusing entries outside `<name>/`.
fn unpack(archive: &Path, name: &str, ras: &Path) -> Result<()> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    for entry in tar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if path.components().next() != Some(Component::Normal(OsStr::new(name))) {
            return Err(RiskflowError::InvalidInput(format!(
                "archive entry {} is outside '{}'",
                path.display(),
                name
            )));
        }
        if !entry.unpack_in(ras)? {
            return Err(RiskflowError::InvalidInput(format!(
                "archive entry {} escapes the repository",
                path.display()
            )));
        }
    }
    Ok(())
}

/// A single normal path component: no separators, no `.`/`..`, not empty.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskflow_test_utils::LINEAR_TABLE;
    use serde_json::json;
    use tempfile::TempDir;

    struct TempRepository {
        dir: TempDir,
        repo: Repository,
    }

    impl TempRepository {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let repo = Repository::new(RepositoryConfig::at(dir.path()));
            Self { dir, repo }
        }

        fn with_default_table(table: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("default.tsv");
            fs::write(&path, table).unwrap();
            let mut config = RepositoryConfig::at(dir.path());
            config.default_workflow = Some(path.display().to_string());
            Self {
                dir,
                repo: Repository::new(config),
            }
        }

        fn write_file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("caffeine"));
        assert!(is_plain_file_name("custom.tsv"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("a/b"));
        assert!(!is_plain_file_name("/etc"));
        assert!(!is_plain_file_name("a\\b"));
    }

    #[test]
    fn test_create_layout() {
        let t = TempRepository::new();
        let ra = t.repo.create("caffeine").unwrap();
        assert_eq!(ra.step(), 0);
        assert!(ra.id().is_some());

        let dir = t.repo.dir("caffeine");
        assert!(dir.join("hist").is_dir());
        assert!(dir.join("repo").is_dir());
        assert!(dir.join("workflow.tsv").is_file());
        assert!(dir.join("ra.yaml").is_file());
        assert_eq!(t.repo.steps("caffeine").unwrap(), vec![0]);
    }

    #[test]
    fn test_create_rejects_bad_and_existing_names() {
        let t = TempRepository::new();
        assert!(matches!(
            t.repo.create(""),
            Err(RiskflowError::InvalidInput(_))
        ));
        assert!(matches!(
            t.repo.create("../escape"),
            Err(RiskflowError::InvalidInput(_))
        ));
        t.repo.create("caffeine").unwrap();
        assert!(matches!(
            t.repo.create("caffeine"),
            Err(RiskflowError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_create_with_configured_default_workflow() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("linear").unwrap();
        t.repo
            .update("linear", &json!({"general": {"title": "t"}}))
            .unwrap();
        let ra = t.repo.load("linear", None).unwrap();
        assert_eq!(ra.graph().unwrap().entry_node().id, "A");
    }

    #[test]
    fn test_list_and_remove() {
        let t = TempRepository::new();
        assert!(t.repo.list().unwrap().is_empty());
        t.repo.create("b").unwrap();
        t.repo.create("a").unwrap();
        assert_eq!(t.repo.list().unwrap(), vec!["a", "b"]);

        t.repo.remove("a").unwrap();
        assert_eq!(t.repo.list().unwrap(), vec!["b"]);
        assert!(matches!(t.repo.remove("a"), Err(RiskflowError::NotFound(_))));
    }

    #[test]
    fn test_load_unknown() {
        let t = TempRepository::new();
        assert!(matches!(
            t.repo.load("nope", None),
            Err(RiskflowError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_enters_default_workflow() {
        let t = TempRepository::new();
        t.repo.create("caffeine").unwrap();
        let report = t
            .repo
            .update("caffeine", &json!({"general": {"title": "Caffeine"}}))
            .unwrap();
        assert!(report.initialized);
        let ra = t.repo.load("caffeine", None).unwrap();
        assert_eq!(ra.step(), 1);
        assert_eq!(ra.active_nodes(), ["A1"]);
        assert_eq!(t.repo.steps("caffeine").unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_skipped_batch_not_persisted() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        t.repo.update("x", &json!({"general": {}})).unwrap();
        let report = t
            .repo
            .update("x", &json!({"result": [{"id": "C", "summary": "early"}]}))
            .unwrap();
        assert!(!report.changed());
        assert_eq!(t.repo.steps("x").unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_custom_workflow_from_general() {
        let t = TempRepository::new();
        t.repo.create("x").unwrap();
        fs::write(t.repo.dir("x").join("mine.tsv"), LINEAR_TABLE).unwrap();
        t.repo
            .update("x", &json!({"general": {"workflow_custom": "mine.tsv"}}))
            .unwrap();
        let ra = t.repo.load("x", None).unwrap();
        assert_eq!(ra.status().workflow_name.as_deref(), Some("mine.tsv"));
        assert_eq!(ra.active_nodes(), ["A"]);
    }

    #[test]
    fn test_missing_custom_workflow_keeps_default() {
        let t = TempRepository::new();
        t.repo.create("x").unwrap();
        t.repo
            .update("x", &json!({"general": {"workflow_custom": "absent.tsv"}}))
            .unwrap();
        let ra = t.repo.load("x", None).unwrap();
        assert_eq!(ra.status().workflow_name.as_deref(), Some("workflow.tsv"));
    }

    #[test]
    fn test_set_custom_workflow() {
        let t = TempRepository::new();
        t.repo.create("x").unwrap();
        let table = t.write_file("linear.tsv", LINEAR_TABLE);
        t.repo.set_custom_workflow("x", &table).unwrap();
        assert!(t.repo.dir("x").join("linear.tsv").is_file());

        t.repo.update("x", &json!({"general": {}})).unwrap();
        let ra = t.repo.load("x", None).unwrap();
        assert_eq!(ra.status().workflow_name.as_deref(), Some("linear.tsv"));
        assert_eq!(ra.active_nodes(), ["A"]);

        // Too late once the workflow is entered.
        assert!(t.repo.set_custom_workflow("x", &table).is_err());
    }

    #[test]
    fn test_set_custom_workflow_rejects_broken_table() {
        let t = TempRepository::new();
        t.repo.create("x").unwrap();
        let table = t.write_file("broken.tsv", "id\tname\nA\tB\n");
        assert!(matches!(
            t.repo.set_custom_workflow("x", &table),
            Err(RiskflowError::MalformedGraph(_))
        ));
        assert!(!t.repo.dir("x").join("broken.tsv").exists());
    }

    #[test]
    fn test_result_extra_keys_persisted() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        t.repo.update("x", &json!({"general": {}})).unwrap();
        t.repo
            .update(
                "x",
                &json!({"result": [{
                    "id": "A",
                    "values": [{"parameter": "pKa", "value": 0.18, "unit": "nM"}],
                    "summary": "x",
                    "uncertainties": [{"term": "Very likely"}],
                    "methods": [{"name": "PCR"}],
                }]}),
            )
            .unwrap();

        let yaml = fs::read_to_string(t.repo.dir("x").join("ra.yaml")).unwrap();
        assert!(yaml.contains("uncertainties"));
        assert!(yaml.contains("methods"));

        let ra = t.repo.load("x", None).unwrap();
        let stored = &ra.stored_results()[0];
        assert_eq!(stored.extra["uncertainties"][0]["term"], "Very likely");
        assert_eq!(stored.extra["methods"][0]["name"], "PCR");

        // Survives a later rewrite of the snapshot.
        t.repo
            .modify("x", |ra| Ok(ra.add_note("n", "t", "a")))
            .unwrap();
        let ra = t.repo.load("x", None).unwrap();
        assert_eq!(ra.stored_results()[0].extra["methods"][0]["name"], "PCR");
    }

    #[test]
    fn test_non_numeric_value_accepted() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        t.repo.update("x", &json!({"general": {}})).unwrap();
        let report = t
            .repo
            .update(
                "x",
                &json!({"result": [{
                    "id": "A",
                    "values": [{"parameter": "NOAEL", "value": "<10", "unit": "mg/kg"}],
                }]}),
            )
            .unwrap();
        assert_eq!(report.appended(), 1);
        assert_eq!(t.repo.load("x", None).unwrap().active_nodes(), ["B"]);
    }

    #[test]
    fn test_export_import_round_trip() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        t.repo
            .update("x", &json!({"general": {"title": "Caffeine"}}))
            .unwrap();
        t.repo
            .update("x", &json!({"result": [{"id": "A", "values": ["v"], "summary": "s"}]}))
            .unwrap();
        let before = t.repo.load("x", None).unwrap().to_snapshot();

        let archive = t.repo.export("x").unwrap();
        assert_eq!(archive, t.dir.path().join("x.tgz"));
        assert!(archive.is_file());

        t.repo.remove("x").unwrap();
        assert!(!t.repo.exists("x"));

        assert_eq!(t.repo.import(&archive).unwrap(), "x");
        let ra = t.repo.load("x", None).unwrap();
        assert_eq!(ra.to_snapshot(), before);
        assert_eq!(t.repo.steps("x").unwrap(), vec![0, 1, 2]);
        assert_eq!(t.repo.load("x", Some(1)).unwrap().active_nodes(), ["A"]);
    }

    #[test]
    fn test_import_refuses_existing() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        let archive = t.repo.export("x").unwrap();
        t.repo.update("x", &json!({"general": {}})).unwrap();

        assert!(matches!(
            t.repo.import(&archive),
            Err(RiskflowError::AlreadyExists(name)) if name == "x"
        ));
        // The live assessment is untouched.
        assert_eq!(t.repo.load("x", None).unwrap().step(), 1);
    }

    #[test]
    fn test_import_rejects_foreign_entries() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("other").unwrap();
        let renamed = t.dir.path().join("evil.tgz");
        t.repo.export_to("other", &renamed).unwrap();

        assert!(matches!(
            t.repo.import(&renamed),
            Err(RiskflowError::InvalidInput(_))
        ));
        assert!(!t.repo.dir("evil").exists());

        let not_archive = t.write_file("notes.txt", "plain");
        assert!(matches!(
            t.repo.import(&not_archive),
            Err(RiskflowError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_drop_step_must_be_last() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        t.repo.update("x", &json!({"general": {}})).unwrap();
        t.repo
            .update("x", &json!({"result": [{"id": "A", "values": ["v"]}]}))
            .unwrap();
        assert!(matches!(
            t.repo.drop_step("x", 1),
            Err(RiskflowError::NotLastStep { requested: 1, last: 2 })
        ));
        assert_eq!(t.repo.drop_step("x", 2).unwrap().step(), 1);
    }

    #[test]
    fn test_past_step_diagram() {
        let t = TempRepository::with_default_table(LINEAR_TABLE);
        t.repo.create("x").unwrap();
        assert!(t.repo.diagram("x", None).unwrap().contains("workflow undefined"));
        t.repo.update("x", &json!({"general": {}})).unwrap();
        t.repo
            .update("x", &json!({"result": [{"id": "A", "values": ["v"]}]}))
            .unwrap();
        assert!(t.repo.diagram("x", None).unwrap().contains("A-->B"));
        assert!(!t.repo.diagram("x", Some(1)).unwrap().contains("A-->B"));
        assert!(t.repo.diagram("x", Some(0)).unwrap().contains("workflow undefined"));
    }

    #[test]
    fn test_notes_persist_through_modify() {
        let t = TempRepository::new();
        t.repo.create("x").unwrap();
        let id = t
            .repo
            .modify("x", |ra| Ok(ra.add_note("title", "text", "me")))
            .unwrap();
        let ra = t.repo.load("x", None).unwrap();
        assert_eq!(ra.note(id.as_str()).unwrap().author, "me");
        assert_eq!(ra.step(), 0);
    }

    #[test]
    fn test_verify_reports_broken_workflow() {
        let t = TempRepository::new();
        t.repo.create("ok").unwrap();
        t.repo.create("bad").unwrap();
        t.repo.update("bad", &json!({"general": {}})).unwrap();
        fs::write(t.repo.dir("bad").join("workflow.tsv"), "garbage").unwrap();
        t.repo.cache().clear();

        let failures = t.repo.verify().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");
    }
}
