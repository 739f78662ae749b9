//! CLI error taxonomy and exit code mapping.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("no running server found for this project; start one with `agent-brain start`")]
    ServerNotFound,

    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Config(#[from] agentbrain_config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Exit codes follow the external-interfaces convention: 0 ok, 1 error, 2 misuse.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
