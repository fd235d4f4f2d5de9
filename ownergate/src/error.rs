use std::path::Path;

use thiserror::Error;

/// Error type collaborator implementations report their failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building requirements or running an evaluation.
///
/// Configuration-class errors (`Config`, `Pattern`, `Requirements`) are
/// detected before any path is evaluated. Collaborator-class errors
/// (`TeamFetch`, `ChangedPathsFetch`, `ApproversFetch`) abort the run with the
/// failing collaborator named; they are never downgraded to an empty result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid requirements: {message}")]
    Config { message: String },

    #[error("invalid path pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("requirements are not valid")]
    Requirements {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to fetch members of team `{team}`")]
    TeamFetch {
        team: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to fetch the changed paths for the change under review")]
    ChangedPathsFetch {
        #[source]
        source: BoxError,
    },

    #[error("failed to fetch the approvers for the change under review")]
    ApproversFetch {
        #[source]
        source: BoxError,
    },

    #[error("failed to read requirements file `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
