use std::collections::BTreeSet;

use tracing::info;

use crate::error::Error;
use crate::requirement::Requirement;
use crate::teams::{MemberCache, TeamContext, TeamDirectory};

/// Verdict and per-path trace of one evaluation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether every governed path was satisfied.
    pub satisfied: bool,
    /// Per-path outcomes, in input order.
    pub paths: Vec<PathResolution>,
}

/// How a single changed path resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolution {
    pub path: String,
    pub outcome: PathOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// The named requirement governs this path.
    Governed { requirement: String, satisfied: bool },
    /// No requirement applies. The path does not affect the verdict.
    Unconstrained,
}

/// Decide whether `approvers` satisfy `requirements` for every changed path.
///
/// Requirements are scanned last-declared-first for each path, and the first
/// one that applies governs it: in ownership files only the final matching
/// rule for a path counts, and later rules override earlier ones. Every
/// governed path is checked even after a failure, so the trace names each
/// unsatisfied requirement rather than just the first.
pub async fn evaluate(
    requirements: &[Requirement],
    paths: &[String],
    approvers: &[String],
    directory: &dyn TeamDirectory,
) -> Result<Evaluation, Error> {
    let cache = MemberCache::new();
    let ctx = TeamContext {
        directory,
        cache: &cache,
    };

    let mut matched = BTreeSet::new();
    let mut satisfied = true;
    let mut resolutions = Vec::with_capacity(paths.len());

    for path in paths {
        let governing = requirements
            .iter()
            .rev()
            .find(|requirement| requirement.applies_to(path, &mut matched));

        let Some(requirement) = governing else {
            info!(path, "no requirements apply");
            resolutions.push(PathResolution {
                path: path.clone(),
                outcome: PathOutcome::Unconstrained,
            });
            continue;
        };

        let ok = requirement.is_satisfied(approvers, ctx).await?;
        if ok {
            info!(path, requirement = requirement.name(), "requirement satisfied");
        } else {
            info!(path, requirement = requirement.name(), "requirement not satisfied");
            satisfied = false;
        }
        resolutions.push(PathResolution {
            path: path.clone(),
            outcome: PathOutcome::Governed {
                requirement: requirement.name().to_string(),
                satisfied: ok,
            },
        });
    }

    Ok(Evaluation {
        satisfied,
        paths: resolutions,
    })
}
