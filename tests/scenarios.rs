use serde_json::{json, Value};
use tempfile::TempDir;

use riskflow_assessment::{ItemAction, Repository, SkipReason};
use riskflow_core::{RepositoryConfig, RiskflowError};
use riskflow_test_utils::{
    write_table, CONVERGENT_TABLE, DECISION_TABLE, DIAMOND_TABLE, LINEAR_TABLE,
};

/// A throwaway repository whose new assessments start from `table`.
fn repository(table: &str) -> (TempDir, Repository) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = write_table(dir.path(), "default.tsv", table);
    let mut config = RepositoryConfig::at(dir.path());
    config.default_workflow = Some(path.display().to_string());
    (dir, Repository::new(config))
}

fn started(table: &str) -> (TempDir, Repository) {
    let (dir, repo) = repository(table);
    repo.create("ra").expect("create");
    repo.update("ra", &json!({"general": {"title": "scenario"}}))
        .expect("enter workflow");
    (dir, repo)
}

fn task(id: &str) -> Value {
    json!({"id": id, "values": ["measured"], "summary": "done"})
}

fn decision(id: &str, value: bool) -> Value {
    json!({"id": id, "decision": value, "justification": "weight of evidence"})
}

fn submit(repo: &Repository, items: Vec<Value>) {
    repo.update("ra", &json!({ "result": items })).expect("update");
}

fn active(repo: &Repository) -> Vec<String> {
    repo.load("ra", None).expect("load").active_nodes().to_vec()
}

fn step(repo: &Repository) -> u32 {
    repo.load("ra", None).expect("load").step()
}

#[test]
fn test_entry_invariant() {
    let (_dir, repo) = repository(LINEAR_TABLE);
    let ra = repo.create("ra").unwrap();
    assert_eq!(ra.step(), 0);
    assert!(ra.active_nodes().is_empty());

    repo.update("ra", &json!({"general": {"title": "t"}})).unwrap();
    let ra = repo.load("ra", None).unwrap();
    assert_eq!(ra.step(), 1);
    assert_eq!(ra.active_nodes(), ["A"]);
    assert!(ra.stored_results().is_empty());
}

#[test]
fn test_frontier_conservation_and_idempotent_resubmission() {
    let (_dir, repo) = started(CONVERGENT_TABLE);
    submit(&repo, vec![task("A")]);
    assert_eq!(active(&repo), ["B", "C"]);

    submit(&repo, vec![task("B")]);
    assert_eq!(active(&repo), ["C", "D"]);
    let before = repo.load("ra", None).unwrap();

    let report = repo.update("ra", &json!({"result": [task("B")]})).unwrap();
    assert_eq!(report.outcomes[0].action, ItemAction::Edited);
    let after = repo.load("ra", None).unwrap();
    assert_eq!(after.step(), before.step());
    assert_eq!(after.active_nodes(), before.active_nodes());
    assert_eq!(after.stored_results().len(), before.stored_results().len());
}

#[test]
fn test_decision_immutability() {
    let (_dir, repo) = started(DECISION_TABLE);
    submit(&repo, vec![decision("A", true)]);
    assert_eq!(active(&repo), ["B"]);

    let report = repo
        .update("ra", &json!({"result": [decision("A", false)]}))
        .unwrap();
    assert!(matches!(
        report.outcomes[0].action,
        ItemAction::Skipped {
            reason: SkipReason::DecisionImmutable,
            ..
        }
    ));
    let ra = repo.load("ra", None).unwrap();
    assert_eq!(ra.stored_results()[0].decision, Some(true));
    assert_eq!(ra.active_nodes(), ["B"]);
    assert_eq!(ra.step(), 2);
}

#[test]
fn test_step_monotonicity() {
    let (_dir, repo) = started(CONVERGENT_TABLE);
    assert_eq!(step(&repo), 1);

    // Two appends in one batch: one step.
    submit(&repo, vec![task("A")]);
    submit(&repo, vec![task("B"), task("C")]);
    assert_eq!(step(&repo), 3);

    // Edits only: no step.
    submit(&repo, vec![task("A")]);
    assert_eq!(step(&repo), 3);

    // Skips only: no step.
    submit(&repo, vec![json!({"id": "Z", "summary": "early"})]);
    assert_eq!(step(&repo), 3);
    assert_eq!(repo.steps("ra").unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_save_load_round_trip() {
    let (_dir, repo) = started(CONVERGENT_TABLE);
    submit(&repo, vec![task("A")]);
    repo.modify("ra", |ra| Ok(ra.add_note("Analogue", "read-across", "mp")))
        .unwrap();

    let ra = repo.load("ra", None).unwrap();
    let again = repo.load("ra", None).unwrap();
    assert_eq!(ra.to_snapshot(), again.to_snapshot());
    assert_eq!(ra.notes().len(), 1);
    assert_eq!(ra.general().title.as_deref(), Some("scenario"));

    let past = repo.load("ra", Some(1)).unwrap();
    assert_eq!(past.step(), 1);
    assert_eq!(past.active_nodes(), ["A"]);
    assert!(past.stored_results().is_empty());
    assert!(matches!(
        repo.load("ra", Some(9)),
        Err(RiskflowError::StepNotFound(9))
    ));
}

#[test]
fn test_linear_chain() {
    let (_dir, repo) = started(LINEAR_TABLE);
    submit(&repo, vec![task("A")]);
    assert_eq!((step(&repo), active(&repo)), (2, vec!["B".to_string()]));
    submit(&repo, vec![task("B")]);
    assert_eq!((step(&repo), active(&repo)), (3, vec!["C".to_string()]));
    submit(&repo, vec![json!({"id": "C", "summary": "no concern"})]);
    assert_eq!(step(&repo), 4);
    assert!(active(&repo).is_empty());

    let diagram = repo.diagram("ra", None).unwrap();
    assert!(diagram.contains("A-->B"));
    assert!(diagram.contains("B-->C"));
    assert!(diagram.contains("C-->Z999((end))"));
}

#[test]
fn test_decision_branch() {
    let (_dir, repo) = started(DECISION_TABLE);
    let template = repo.template("ra").unwrap();
    assert!(template.contains("# node Is the information sufficient?"));
    assert!(template.contains("decision:"));

    submit(&repo, vec![decision("A", false)]);
    assert_eq!(active(&repo), ["C"]);
    let diagram = repo.diagram("ra", None).unwrap();
    assert!(diagram.contains("A--N-->C"));
    assert!(!diagram.contains("A--Y-->B"));
}

#[test]
fn test_convergent_branches_open_once() {
    let (_dir, repo) = started(CONVERGENT_TABLE);
    submit(&repo, vec![task("A")]);
    submit(&repo, vec![task("B")]);
    submit(&repo, vec![task("C")]);
    assert_eq!(active(&repo), ["D"]);

    let ra = repo.load("ra", None).unwrap();
    let upstream: Vec<String> = ra
        .ancestor_results("D")
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(upstream, ["A", "B", "C"]);

    submit(&repo, vec![decision("D", true)]);
    assert_eq!(active(&repo), ["Z"]);
}

#[test]
fn test_decision_branches_share_downstream_node() {
    let (_dir, repo) = started(DIAMOND_TABLE);
    submit(&repo, vec![task("A")]);
    assert_eq!(active(&repo), ["B", "C"]);

    // `B` opens `D` and `E`; `C` also leads to `D` in the same batch.
    submit(&repo, vec![decision("B", true), task("C")]);
    assert_eq!(active(&repo), ["D", "E"]);
    assert_eq!(step(&repo), 3);

    submit(&repo, vec![task("D")]);
    assert_eq!(active(&repo), ["E", "Z"]);
    submit(&repo, vec![task("E")]);
    assert_eq!(active(&repo), ["Z"]);
}

#[test]
fn test_decision_no_branch_converges_with_parallel_path() {
    let (_dir, repo) = started(DIAMOND_TABLE);
    submit(&repo, vec![task("A")]);
    submit(&repo, vec![decision("B", false)]);
    assert_eq!(active(&repo), ["C", "D"]);

    submit(&repo, vec![task("C")]);
    let ra = repo.load("ra", None).unwrap();
    assert_eq!(ra.active_nodes(), ["D"]);
    assert_eq!(ra.active_nodes().iter().filter(|a| *a == "D").count(), 1);
}

#[test]
fn test_drop_last_step_rolls_back_to_earlier_state() {
    let (_dir, repo) = started(LINEAR_TABLE);
    submit(&repo, vec![task("A")]);
    let after_first = repo.load("ra", None).unwrap().to_snapshot();
    submit(&repo, vec![task("B")]);
    submit(&repo, vec![json!({"id": "C", "summary": "no concern"})]);
    assert_eq!(step(&repo), 4);

    assert_eq!(repo.drop_last_step("ra").unwrap().step(), 3);
    assert_eq!(repo.drop_last_step("ra").unwrap().step(), 2);
    assert_eq!(repo.load("ra", None).unwrap().to_snapshot(), after_first);
    assert_eq!(repo.steps("ra").unwrap(), vec![0, 1, 2]);

    assert_eq!(repo.drop_last_step("ra").unwrap().step(), 1);
    assert!(matches!(
        repo.drop_last_step("ra"),
        Err(RiskflowError::CannotRemoveFirstStep)
    ));
}

#[test]
fn test_default_workflow_walkthrough() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::new(RepositoryConfig::at(dir.path()));
    repo.create("caffeine").unwrap();
    repo.update("caffeine", &json!({"general": {"title": "Caffeine"}}))
        .unwrap();

    let text = |id: &str| json!({"id": id, "summary": "described"});
    repo.update("caffeine", &json!({"result": [text("A1")]})).unwrap();
    repo.update("caffeine", &json!({"result": [text("A2")]})).unwrap();
    repo.update("caffeine", &json!({"result": [decision("A3", true)]}))
        .unwrap();

    let ra = repo.load("caffeine", None).unwrap();
    assert_eq!(ra.active_nodes(), ["Z1"]);
    assert_eq!(ra.step(), 4);
}
