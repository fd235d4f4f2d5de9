use std::fmt;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::engine::{self, Evaluation};
use crate::error::{BoxError, Error};
use crate::requirement::Requirement;
use crate::teams::TeamDirectory;

/// Collaborator producing the change under evaluation.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Distinct, sorted paths the change touches, relative to the repository
    /// root with no leading slash.
    async fn changed_paths(&self) -> Result<Vec<String>, BoxError>;

    /// Distinct, sorted users whose latest review state is an approval.
    async fn approvers(&self) -> Result<Vec<String>, BoxError>;
}

/// Sink for the final verdict. Reporting is fire-and-forget: a sink failure
/// is logged but never changes the verdict or fails the run.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn report(&self, state: VerdictState, description: &str) -> Result<(), BoxError>;
}

/// Reportable outcome states, in commit-status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictState {
    Success,
    Pending,
    Failure,
    Error,
}

impl VerdictState {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictState::Success => "success",
            VerdictState::Pending => "pending",
            VerdictState::Failure => "failure",
            VerdictState::Error => "error",
        }
    }
}

impl fmt::Display for VerdictState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict of a gate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub state: VerdictState,
    pub description: String,
    pub evaluation: Evaluation,
}

impl Error {
    /// The state a reporter should post when this error aborts a run, with a
    /// description. Configuration problems read as review failures with the
    /// specific message; collaborator problems read as infrastructure errors
    /// with a generic one.
    pub fn verdict(&self) -> (VerdictState, String) {
        match self {
            Error::Config { .. }
            | Error::Pattern { .. }
            | Error::Requirements { .. }
            | Error::Io { .. } => (VerdictState::Failure, self.to_string()),
            Error::TeamFetch { .. }
            | Error::ChangedPathsFetch { .. }
            | Error::ApproversFetch { .. } => (
                VerdictState::Error,
                "encountered an unexpected error".to_string(),
            ),
        }
    }
}

/// Run the gate end to end: fetch the change, evaluate every requirement
/// against it, and report the resulting state.
///
/// `fail` escalates an unsatisfied run from `Pending` to `Failure`; pending
/// suits branch-protection setups where the status flips once reviews arrive,
/// failure suits setups that should go red immediately.
pub async fn run(
    requirements: &[Requirement],
    source: &dyn ChangeSource,
    directory: &dyn TeamDirectory,
    sink: &dyn StatusSink,
    fail: bool,
) -> Result<Verdict, Error> {
    info!(count = requirements.len(), "loaded review requirements");

    let approvers = source
        .approvers()
        .await
        .map_err(|source| Error::ApproversFetch { source })?;
    info!(count = approvers.len(), ?approvers, "found approving reviewers");

    let paths = source
        .changed_paths()
        .await
        .map_err(|source| Error::ChangedPathsFetch { source })?;
    info!(count = paths.len(), "change touches paths");

    let evaluation = engine::evaluate(requirements, &paths, &approvers, directory).await?;

    let (state, description) = if evaluation.satisfied {
        (
            VerdictState::Success,
            "All required reviews have been provided!",
        )
    } else {
        let state = if fail {
            VerdictState::Failure
        } else {
            VerdictState::Pending
        };
        let description = if approvers.is_empty() {
            "Awaiting reviews..."
        } else {
            "Awaiting more reviews..."
        };
        (state, description)
    };

    if let Err(error) = sink.report(state, description).await {
        warn!(%state, error = %error, "failed to report the verdict");
    }

    Ok(Verdict {
        state,
        description: description.to_string(),
        evaluation,
    })
}
