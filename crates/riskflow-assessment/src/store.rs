use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use riskflow_core::{Result, RiskflowError, Step};

use crate::snapshot::Snapshot;

const CURRENT_FILE: &str = "ra.yaml";
const HISTORY_DIR: &str = "hist";
const SNAPSHOT_EXT: &str = "yaml";
const BACKUP_SUFFIX: &str = ".bak";

/// File-backed snapshot store for one assessment directory.
///
/// Layout:
/// - `ra.yaml`: the current snapshot.
/// - `hist/ra_step<NNNN>_<timestamp>.yaml`: one live snapshot per step.
/// - `hist/*.yaml.bak`: superseded snapshots, never read back.
///
/// The step of a historic snapshot is always read from its content, not from
/// its file name. There is no locking; concurrent writers clobber each other.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub fn history_dir(&self) -> PathBuf {
        self.dir.join(HISTORY_DIR)
    }

    /// Whether a current snapshot exists.
    pub fn exists(&self) -> bool {
        self.current_path().is_file()
    }

    /// Write `snapshot` as current and record it in the history.
    ///
    /// A live historic snapshot for the same step is renamed with a backup
    /// suffix first. Returns the path of the new historic file.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let history = self.history_dir();
        fs::create_dir_all(&history)?;

        let yaml = snapshot.to_yaml()?;
        fs::write(self.current_path(), &yaml)?;

        let step = snapshot.step();
        for (path, old) in self.history()? {
            if old.step() == step {
                let backup = backup_path(&path);
                fs::rename(&path, &backup)?;
                info!(path = %path.display(), step, "Superseded snapshot kept as backup");
            }
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
        let hist_path = history.join(format!("ra_step{:04}_{}.{}", step, stamp, SNAPSHOT_EXT));
        fs::write(&hist_path, &yaml)?;
        debug!(path = %hist_path.display(), step, "Snapshot saved");
        Ok(hist_path)
    }

    /// The current snapshot.
    pub fn load_current(&self) -> Result<Snapshot> {
        let path = self.current_path();
        if !path.is_file() {
            return Err(RiskflowError::NotFound(format!(
                "snapshot {}",
                path.display()
            )));
        }
        Snapshot::read(&path)
    }

    /// The snapshot for `step`, or the current one when `step` is `None`.
    ///
    /// Checks the current snapshot first, then scans the history.
    pub fn load(&self, step: Option<Step>) -> Result<Snapshot> {
        let current = self.load_current()?;
        let Some(step) = step else {
            return Ok(current);
        };
        if current.step() == step {
            return Ok(current);
        }
        self.history()?
            .into_iter()
            .map(|(_, snapshot)| snapshot)
            .find(|s| s.step() == step)
            .ok_or(RiskflowError::StepNotFound(step))
    }

    /// Steps with a live historic snapshot, ascending.
    pub fn steps(&self) -> Result<Vec<Step>> {
        let mut steps: Vec<Step> = self.history()?.iter().map(|(_, s)| s.step()).collect();
        steps.sort_unstable();
        steps.dedup();
        Ok(steps)
    }

    /// Roll back one step: the historic snapshot for `step - 1` becomes
    /// current and the history of the discarded step is deleted.
    pub fn drop_last_step(&self) -> Result<Snapshot> {
        let current = self.load_current()?;
        let step = current.step();
        if step <= 1 {
            return Err(RiskflowError::CannotRemoveFirstStep);
        }

        let history = self.history()?;
        let (prev_path, prev) = history
            .iter()
            .find(|(_, s)| s.step() == step - 1)
            .ok_or(RiskflowError::StepNotFound(step - 1))?;

        fs::copy(prev_path, self.current_path())?;
        for (path, s) in &history {
            if s.step() == step {
                fs::remove_file(path)?;
                debug!(path = %path.display(), "Removed snapshot of discarded step");
            }
        }
        info!(dir = %self.dir.display(), from = step, to = step - 1, "Dropped last step");
        Ok(prev.clone())
    }

    /// Live historic snapshots, sorted by file name. Unreadable files are skipped.
    fn history(&self) -> Result<Vec<(PathBuf, Snapshot)>> {
        let dir = self.history_dir();
        if !dir.is_dir() {
            return Ok(vec![]);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == SNAPSHOT_EXT))
            .collect();
        paths.sort();

        let mut snapshots = Vec::with_capacity(paths.len());
        for path in paths {
            match Snapshot::read(&path) {
                Ok(s) => snapshots.push((path, s)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable snapshot"),
            }
        }
        Ok(snapshots)
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}
