pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, RepositoryConfig};
pub use error::{Result, RiskflowError};
pub use types::*;
