//! Decide whether a change has the approvals its ownership rules require.
//!
//! Requirements come from an ownership file (`CODEOWNERS` dialect) or a YAML
//! document, and pair path patterns with the teams whose review satisfies
//! them. Evaluation scans requirements last-declared-first for each changed
//! path, so later rules override earlier ones the way ownership files
//! specify, and aggregates a single verdict across all paths.
//!
//! The crate talks to the outside world through three traits: a
//! [`ChangeSource`] supplies the changed paths and current approvers, a
//! [`TeamDirectory`] resolves team rosters, and a [`StatusSink`] receives the
//! final verdict. [`run`] wires them together; [`evaluate`] is the
//! transport-free core for callers that already hold the inputs.
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), ownergate::Error> {
//! let requirements = ownergate::load_requirements(".github/CODEOWNERS", &["/docs/"])?;
//! let teams: HashMap<String, Vec<String>> =
//!     HashMap::from([("writers".to_string(), vec!["alice".to_string()])]);
//!
//! let changed = vec!["docs/guide.md".to_string()];
//! let approvers = vec!["alice".to_string()];
//! let evaluation = ownergate::evaluate(&requirements, &changed, &approvers, &teams).await?;
//! assert!(evaluation.satisfied);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod parser;
pub mod pattern;
pub mod reviews;
pub mod teams;

mod requirement;

pub use config::{
    build_requirements, detect_format, load_requirements, parse_enforce_on, PathsConfig,
    RequirementConfig, RequirementsFormat, TeamExpr,
};
pub use engine::{evaluate, Evaluation, PathOutcome, PathResolution};
pub use error::{BoxError, Error};
pub use gate::{run, ChangeSource, StatusSink, Verdict, VerdictState};
pub use requirement::Requirement;
pub use teams::{MemberCache, TeamDirectory};
