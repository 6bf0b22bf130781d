use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskflowError};

/// Top-level riskflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub log: Option<LogConfig>,
}

/// Where assessments live and which workflow table new assessments start from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Root directory. Assessments are stored under `<root>/ras/<name>`.
    #[serde(default = "default_root")]
    pub root: String,
    /// Workflow table copied into new assessments. None = built-in table.
    #[serde(default)]
    pub default_workflow: Option<String>,
    /// File name of the workflow table inside each assessment directory.
    #[serde(default = "default_workflow_file")]
    pub workflow_file: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_workflow: None,
            workflow_file: default_workflow_file(),
        }
    }
}

impl RepositoryConfig {
    /// Build a config rooted at an explicit directory (no `~` expansion needed).
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().display().to_string(),
            ..Self::default()
        }
    }

    /// Resolve the root directory (expand ~).
    pub fn root_dir(&self) -> PathBuf {
        expand_home(&self.root)
    }

    /// Directory holding one sub-directory per assessment.
    pub fn assessments_dir(&self) -> PathBuf {
        self.root_dir().join("ras")
    }

    /// Directory of a single assessment.
    pub fn assessment_dir(&self, name: &str) -> PathBuf {
        self.assessments_dir().join(name)
    }

    /// Resolved path of the configured default workflow table, if any.
    pub fn default_workflow_path(&self) -> Option<PathBuf> {
        self.default_workflow.as_deref().map(expand_home)
    }
}

/// Logging configuration for the command-line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `riskflow=debug`. `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_root() -> String { "~/.riskflow".to_string() }
fn default_workflow_file() -> String { "workflow.tsv".to_string() }
fn default_log_filter() -> String { "riskflow=info,warn".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| RiskflowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| RiskflowError::Config(e.to_string()))
    }

    /// Write config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RiskflowError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the repository root directory (expand ~).
    pub fn repository_dir(&self) -> PathBuf {
        self.repository.root_dir()
    }

    /// Effective log filter directive.
    pub fn log_filter(&self) -> String {
        self.log
            .as_ref()
            .map(|l| l.filter.clone())
            .unwrap_or_else(default_log_filter)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_RISKFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_RISKFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_RISKFLOW_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_RISKFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_RISKFLOW_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.repository.root, "~/.riskflow");
        assert_eq!(config.repository.workflow_file, "workflow.tsv");
        assert!(config.repository.default_workflow.is_none());
        assert!(config.log.is_none());
        assert_eq!(config.log_filter(), "riskflow=info,warn");
    }

    #[test]
    fn test_repository_paths() {
        let repo = RepositoryConfig::at("/srv/tox");
        assert_eq!(repo.root_dir(), PathBuf::from("/srv/tox"));
        assert_eq!(repo.assessments_dir(), PathBuf::from("/srv/tox/ras"));
        assert_eq!(
            repo.assessment_dir("caffeine"),
            PathBuf::from("/srv/tox/ras/caffeine")
        );
    }

    #[test]
    fn test_home_expansion() {
        std::env::set_var("HOME", "/home/assessor");
        let repo = RepositoryConfig::default();
        assert_eq!(repo.root_dir(), PathBuf::from("/home/assessor/.riskflow"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("riskflow.toml");

        let mut config = AppConfig::default();
        config.repository.root = "/data/riskflow".to_string();
        config.log = Some(LogConfig {
            filter: "riskflow=debug".to_string(),
        });
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.repository.root, "/data/riskflow");
        assert_eq!(loaded.log_filter(), "riskflow=debug");
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/riskflow.toml")).unwrap_err();
        assert!(matches!(err, RiskflowError::ConfigNotFound(_)));
    }
}
