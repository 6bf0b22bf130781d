use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskflowError {
    // Lookup errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Step {0} not found")]
    StepNotFound(u32),

    // Workflow definition errors
    #[error("Malformed workflow graph: {0}")]
    MalformedGraph(String),

    #[error("Node {node} is a {actual} node, operation requires {expected}")]
    WrongNodeKind {
        node: String,
        expected: String,
        actual: String,
    },

    // Update errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Update rejected: {0}")]
    UpdateRejected(String),

    // History errors
    #[error("The first step cannot be removed")]
    CannotRemoveFirstStep,

    #[error("Only the last step can be removed (requested {requested}, last is {last})")]
    NotLastStep { requested: u32, last: u32 },

    // Repository errors
    #[error("Risk assessment already exists: {0}")]
    AlreadyExists(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RiskflowError>;
