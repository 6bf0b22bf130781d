use std::path::Path;

use tracing_subscriber::EnvFilter;

use riskflow_assessment::Repository;
use riskflow_core::AppConfig;
use riskflow_workflow::{WorkflowGraph, DEFAULT_WORKFLOW_TABLE};

struct CheckResult {
    label: String,
    ok: bool,
    detail: String,
}

pub fn run_doctor(config_path: Option<&Path>, config: &AppConfig, repo: &Repository) {
    let checks = vec![
        check_config(config_path),
        check_log_filter(config),
        check_repository(config),
        check_default_workflow(config),
        check_assessments(repo),
    ];

    let mut ok_count = 0;
    let mut fail_count = 0;

    for check in &checks {
        let icon = if check.ok { "[OK]" } else { "[!!]" };
        println!("  {} {}: {}", icon, check.label, check.detail);
        if check.ok {
            ok_count += 1;
        } else {
            fail_count += 1;
        }
    }

    println!();
    println!("  {} passed, {} issues found", ok_count, fail_count);
}

fn check_config(path: Option<&Path>) -> CheckResult {
    match path {
        Some(p) if p.exists() => CheckResult {
            label: "Config".into(),
            ok: true,
            detail: format!("{}", p.display()),
        },
        Some(p) => CheckResult {
            label: "Config".into(),
            ok: false,
            detail: format!("{} (does not exist, using defaults)", p.display()),
        },
        None => CheckResult {
            label: "Config".into(),
            ok: true,
            detail: "None found, using defaults".into(),
        },
    }
}

fn check_log_filter(config: &AppConfig) -> CheckResult {
    let filter = config.log_filter();
    match EnvFilter::try_new(&filter) {
        Ok(_) => CheckResult {
            label: "Log filter".into(),
            ok: true,
            detail: filter,
        },
        Err(e) => CheckResult {
            label: "Log filter".into(),
            ok: false,
            detail: format!("'{}': {}", filter, e),
        },
    }
}

fn check_repository(config: &AppConfig) -> CheckResult {
    let dir = config.repository.assessments_dir();
    if !dir.is_dir() {
        return CheckResult {
            label: "Repository".into(),
            ok: false,
            detail: format!("{} (does not exist, run `riskflow init`)", dir.display()),
        };
    }

    let probe = dir.join(".doctor_test");
    match std::fs::write(&probe, "test") {
        Ok(_) => {
            std::fs::remove_file(&probe).ok();
            CheckResult {
                label: "Repository".into(),
                ok: true,
                detail: format!("{}", dir.display()),
            }
        }
        Err(e) => CheckResult {
            label: "Repository".into(),
            ok: false,
            detail: format!("{} (not writable: {})", dir.display(), e),
        },
    }
}

fn check_default_workflow(config: &AppConfig) -> CheckResult {
    let (source, parsed) = match config.repository.default_workflow_path() {
        Some(path) => (path.display().to_string(), WorkflowGraph::load(&path)),
        None => ("built-in".to_string(), WorkflowGraph::parse(DEFAULT_WORKFLOW_TABLE)),
    };
    match parsed {
        Ok(graph) => CheckResult {
            label: "Default workflow".into(),
            ok: true,
            detail: format!("{} ({} nodes)", source, graph.len()),
        },
        Err(e) => CheckResult {
            label: "Default workflow".into(),
            ok: false,
            detail: format!("{}: {}", source, e),
        },
    }
}

fn check_assessments(repo: &Repository) -> CheckResult {
    let total = match repo.list() {
        Ok(names) => names.len(),
        Err(e) => {
            return CheckResult {
                label: "Assessments".into(),
                ok: false,
                detail: format!("cannot list: {}", e),
            }
        }
    };

    match repo.verify() {
        Ok(failures) if failures.is_empty() => CheckResult {
            label: "Assessments".into(),
            ok: true,
            detail: format!("{} load cleanly", total),
        },
        Ok(failures) => {
            let bad: Vec<String> = failures
                .iter()
                .map(|(name, e)| format!("'{}' ({})", name, e))
                .collect();
            CheckResult {
                label: "Assessments".into(),
                ok: false,
                detail: format!("{} of {} broken: {}", bad.len(), total, bad.join(", ")),
            }
        }
        Err(e) => CheckResult {
            label: "Assessments".into(),
            ok: false,
            detail: e.to_string(),
        },
    }
}
