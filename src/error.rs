//! Error types for quick-commit using thiserror.

use thiserror::Error;

/// Missing or invalid connection and model settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("'QC_MODEL' not set")]
    MissingModel,

    #[error("could not parse url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for 'QC_OPTION_TEMPERATURE': '{0}'")]
    InvalidTemperature(String),

    #[error("invalid header 'QC_HEADER_{0}'")]
    InvalidHeader(String),

    #[error("invalid theme color '{value}' for '{field}'")]
    InvalidColor { field: &'static str, value: String },

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Failures of the model-serving endpoint.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("failed to reach model server: {0}")]
    Request(#[source] reqwest::Error),

    #[error("model server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("stream error: {0}")]
    Stream(#[source] reqwest::Error),

    #[error("failed to parse streaming response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("model error: {0}")]
    Model(String),
}

/// Failures running the git binary.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("'{command}' failed: {output}")]
    Failed { command: String, output: String },
}

/// Everything that can end the process with an error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no changes added to commit (use \"git add\" and/or \"git commit -a\")")]
    NoChanges,

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("no commit message found")]
    NoCommitMessage,

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::NoCommitMessage.to_string(), "no commit message found");
        assert!(Error::NoChanges.to_string().starts_with("no changes added to commit"));
        assert_eq!(
            Error::from(ConfigError::MissingModel).to_string(),
            "'QC_MODEL' not set"
        );
    }

    #[test]
    fn test_git_error_includes_output() {
        let err = GitError::Failed {
            command: "git commit".to_string(),
            output: "nothing to commit".to_string(),
        };
        assert_eq!(err.to_string(), "'git commit' failed: nothing to commit");
    }
}
