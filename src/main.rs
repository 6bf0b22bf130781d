mod doctor;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use riskflow_assessment::{Assessment, Repository};
use riskflow_core::{AppConfig, Step};

#[derive(Parser)]
#[command(name = "riskflow", version, about = "Step-wise chemical risk assessment workflows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "RISKFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of YAML
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the repository directory
    Init {
        /// Repository root directory
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Create a new risk assessment
    New {
        name: String,
        /// Write the step 0 template to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List risk assessments
    List,
    /// Show general information and active nodes
    Info { name: String },
    /// Show the progress header
    Status {
        name: String,
        #[arg(long)]
        step: Option<Step>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Submit general information or node results from a YAML or JSON file
    Update {
        name: String,
        #[arg(short, long)]
        input: PathBuf,
        /// Write the template for the next step to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the template of the input still needed
    Template {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show an active node's task, or all active nodes
    Active { name: String, node: Option<String> },
    /// Show submitted results
    Results {
        name: String,
        /// Single node, shown together with its task description
        node: Option<String>,
        #[arg(long)]
        step: Option<Step>,
    },
    /// Results upstream of a decision node
    Upstream { name: String, node: String },
    /// List notes
    Notes { name: String },
    /// Manage notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// Print the workflow diagram
    Workflow {
        name: String,
        #[arg(long)]
        step: Option<Step>,
    },
    /// Use a custom workflow table (step 0 only)
    SetWorkflow { name: String, file: PathBuf },
    /// List recorded steps
    Steps { name: String },
    /// Remove a risk assessment, or roll back its last step
    Kill {
        name: String,
        /// Roll back this step; it must be the last one
        #[arg(long, conflicts_with = "last")]
        step: Option<Step>,
        /// Roll back the last step
        #[arg(long)]
        last: bool,
    },
    /// Pack a risk assessment into a .tgz archive
    Export {
        name: String,
        /// Archive path, default `<root>/<name>.tgz`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Unpack an exported archive; the assessment is named after the file
    Import { file: PathBuf },
    /// Show current configuration
    Config,
    /// Run repository health checks
    Doctor,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Attach a note
    Add {
        name: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        text: String,
        #[arg(long, env = "USER", default_value = "")]
        author: String,
    },
    /// Show one note
    Show { name: String, id: String },
    /// Delete a note
    Remove { name: String, id: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "riskflow", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = match &config_path {
        Some(path) if path.exists() => AppConfig::load(path)?,
        _ => AppConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init { root } = &cli.command {
        let dest = config_path
            .or_else(default_config_path)
            .context("cannot determine a config location; pass --config")?;
        return run_init(&dest, config, root.as_deref());
    }

    match &config_path {
        Some(path) if path.exists() => info!(path = %path.display(), "Config loaded"),
        _ => warn!("No config file found, using defaults. Run `riskflow init` to create one"),
    }

    let repo = Repository::new(config.repository.clone());
    let out = Output { json: cli.json };

    match cli.command {
        Commands::New { name, output } => {
            let ra = repo.create(&name)?;
            println!(
                "Created risk assessment '{}' ({})",
                name,
                ra.id().map(|id| id.as_str()).unwrap_or_default()
            );
            if let Some(path) = output {
                write_file(&path, &ra.template()?)?;
            }
        }
        Commands::List => {
            let names = repo.list()?;
            if out.json {
                out.value(&names)?;
            } else if names.is_empty() {
                println!("No risk assessments in {}", repo.config().assessments_dir().display());
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
        Commands::Info { name } => {
            let ra = repo.load(&name, None)?;
            out.value(&serde_json::json!({
                "ra": ra.status(),
                "general": ra.general(),
                "active": ra.active_node_summaries(),
            }))?;
        }
        Commands::Status { name, step, output } => {
            let ra = repo.load(&name, step)?;
            let text = out.render(ra.status())?;
            match output {
                Some(path) => write_file(&path, &text)?,
                None => print!("{}", text),
            }
        }
        Commands::Update { name, input, output } => {
            let payload = read_payload(&input)?;
            let report = repo.update(&name, &payload)?;
            out.value(&report)?;
            if let Some(path) = output {
                write_file(&path, &repo.template(&name)?)?;
            }
        }
        Commands::Template { name, output } => {
            let text = repo.template(&name)?;
            match output {
                Some(path) => write_file(&path, &text)?,
                None => print!("{}", text),
            }
        }
        Commands::Active { name, node } => {
            let ra = repo.load(&name, None)?;
            match node {
                Some(id) => {
                    let task = ra
                        .active_node(&id)
                        .with_context(|| format!("node '{}' is not active", id))?;
                    out.value(&task)?;
                }
                None => out.value(&ra.active_node_summaries())?,
            }
        }
        Commands::Results { name, node, step } => {
            let ra = repo.load(&name, step)?;
            match node {
                Some(id) => {
                    let view = ra
                        .task_view(&id)
                        .with_context(|| format!("no result for node '{}'", id))?;
                    out.value(&view)?;
                }
                None => out.value(&ra.results())?,
            }
        }
        Commands::Upstream { name, node } => {
            let ra = repo.load(&name, None)?;
            out.value(&ra.ancestor_results(&node)?)?;
        }
        Commands::Notes { name } => {
            let ra = repo.load(&name, None)?;
            out.value(ra.notes())?;
        }
        Commands::Note { action } => run_note(&repo, &out, action)?,
        Commands::Workflow { name, step } => {
            print!("{}", repo.diagram(&name, step)?);
        }
        Commands::SetWorkflow { name, file } => {
            repo.set_custom_workflow(&name, &file)?;
            println!("Workflow of '{}' set to {}", name, file.display());
        }
        Commands::Steps { name } => {
            let steps = repo.steps(&name)?;
            if out.json {
                out.value(&steps)?;
            } else {
                for step in steps {
                    println!("{}", step);
                }
            }
        }
        Commands::Kill { name, step, last } => {
            let rolled_back: Option<Assessment> = match (step, last) {
                (Some(step), _) => Some(repo.drop_step(&name, step)?),
                (None, true) => Some(repo.drop_last_step(&name)?),
                (None, false) => None,
            };
            match rolled_back {
                Some(ra) => println!("'{}' rolled back to step {}", name, ra.step()),
                None => {
                    repo.remove(&name)?;
                    println!("Removed risk assessment '{}'", name);
                }
            }
        }
        Commands::Export { name, output } => {
            let path = match output {
                Some(path) => {
                    repo.export_to(&name, &path)?;
                    path
                }
                None => repo.export(&name)?,
            };
            println!("Exported '{}' to {}", name, path.display());
        }
        Commands::Import { file } => {
            let name = repo.import(&file)?;
            println!("Imported risk assessment '{}'", name);
        }
        Commands::Config => {
            if out.json {
                out.value(&config)?;
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Doctor => {
            println!("riskflow doctor");
            println!();
            doctor::run_doctor(config_path.as_deref(), &config, &repo);
        }
        Commands::Init { .. } => unreachable!("handled before repository setup"),
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn run_note(repo: &Repository, out: &Output, action: NoteAction) -> anyhow::Result<()> {
    match action {
        NoteAction::Add {
            name,
            title,
            text,
            author,
        } => {
            let id = repo.modify(&name, |ra| Ok(ra.add_note(title, text, author)))?;
            println!("{}", id);
        }
        NoteAction::Show { name, id } => {
            let ra = repo.load(&name, None)?;
            let note = ra
                .note(&id)
                .with_context(|| format!("note '{}' not found", id))?;
            out.value(note)?;
        }
        NoteAction::Remove { name, id } => {
            let note = repo.modify(&name, |ra| ra.remove_note(&id))?;
            println!("Removed note '{}'", note.title);
        }
    }
    Ok(())
}

fn run_init(dest: &Path, mut config: AppConfig, root: Option<&Path>) -> anyhow::Result<()> {
    if let Some(root) = root {
        config.repository.root = root.display().to_string();
    }
    let ras = config.repository.assessments_dir();
    std::fs::create_dir_all(&ras)
        .with_context(|| format!("creating repository at {}", ras.display()))?;
    config.save(dest)?;
    println!("Config written to {}", dest.display());
    println!("Repository: {}", config.repository_dir().display());
    Ok(())
}

/// YAML or JSON printer selected by `--json`.
struct Output {
    json: bool,
}

impl Output {
    fn render<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<String> {
        if self.json {
            Ok(serde_json::to_string_pretty(value)? + "\n")
        } else {
            Ok(serde_yaml::to_string(value)?)
        }
    }

    fn value<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        print!("{}", self.render(value)?);
        Ok(())
    }
}

/// Submission files are YAML; JSON parses as YAML too.
fn read_payload(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_file(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Written");
    Ok(())
}

/// Explicit path, else `./riskflow.toml`, else `~/.riskflow/config.toml` when present.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("riskflow.toml");
    if local.exists() {
        return Some(local);
    }
    default_config_path().filter(|p| p.exists())
}

fn default_config_path() -> Option<PathBuf> {
    dirs_home().map(|h| h.join(".riskflow").join("config.toml"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
