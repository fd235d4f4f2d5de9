use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ownergate::reviews::{approvers_from_reviews, Review};
use ownergate::{
    BoxError, ChangeSource, PathOutcome, Requirement, RequirementsFormat, StatusSink, Verdict,
    VerdictState,
};

#[derive(Parser)]
#[command(version, about = "Check that a change has the reviews its ownership rules require")]
struct Cli {
    /// Changed paths to evaluate, relative to the repository root.
    paths: Vec<String>,

    /// Requirements file. Files named CODEOWNERS parse in the ownership-file
    /// dialect; anything else parses as YAML.
    #[clap(short = 'f', long = "file")]
    requirements_file: Option<PathBuf>,

    /// Inline YAML requirements; takes precedence over --file.
    #[arg(long)]
    requirements: Option<String>,

    /// Path literal to enforce, as written in the ownership file. Repeatable.
    /// Only the ownership-file dialect consults this list.
    #[arg(long = "enforce-on")]
    enforce_on: Vec<String>,

    /// YAML array of path literals to enforce.
    #[arg(long)]
    enforce_on_file: Option<PathBuf>,

    /// File with one changed path per line, merged with the positional paths.
    #[arg(long)]
    paths_file: Option<PathBuf>,

    /// User whose approval is already in hand. Repeatable.
    #[arg(long = "approver")]
    approvers: Vec<String>,

    /// File with one approving user per line.
    #[arg(long)]
    approvers_file: Option<PathBuf>,

    /// Review log with one `user state` pair per line, reduced to approvers
    /// by latest-state-wins.
    #[arg(long)]
    reviews_file: Option<PathBuf>,

    /// YAML map from team name to member list. Rules naming teams fail
    /// without it; `@user` rules work either way.
    #[arg(long)]
    teams_file: Option<PathBuf>,

    /// Report an unsatisfied change as a failure instead of pending.
    #[arg(long)]
    fail: bool,
}

impl Cli {
    fn enforce_list(&self) -> Result<Vec<String>> {
        let mut enforce = self.enforce_on.clone();
        if let Some(path) = &self.enforce_on_file {
            let source = read_file(path)?;
            enforce.extend(ownergate::parse_enforce_on(&source)?);
        }
        Ok(enforce)
    }

    fn requirements(&self, enforce_on: &[String]) -> Result<Vec<Requirement>> {
        if let Some(source) = &self.requirements {
            if self.requirements_file.is_some() {
                warn!("ignoring --file because --requirements was given");
            }
            return Ok(ownergate::build_requirements(
                source,
                RequirementsFormat::Yaml,
                enforce_on,
            )?);
        }
        let Some(path) = &self.requirements_file else {
            bail!("either --requirements or --file is required");
        };
        Ok(ownergate::load_requirements(path, enforce_on)?)
    }

    fn changed_paths(&self) -> Result<Vec<String>> {
        let mut paths = self.paths.clone();
        if let Some(file) = &self.paths_file {
            paths.extend(read_lines(file)?);
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn approver_list(&self) -> Result<Vec<String>> {
        let mut approvers = self.approvers.clone();
        if let Some(file) = &self.approvers_file {
            approvers.extend(read_lines(file)?);
        }
        if let Some(file) = &self.reviews_file {
            let reviews = read_reviews(file)?;
            approvers.extend(approvers_from_reviews(&reviews));
        }
        approvers.sort();
        approvers.dedup();
        Ok(approvers)
    }

    fn team_directory(&self) -> Result<HashMap<String, Vec<String>>> {
        let Some(path) = &self.teams_file else {
            return Ok(HashMap::new());
        };
        let source = read_file(path)?;
        serde_yaml::from_str(&source)
            .with_context(|| format!("parsing team rosters from {}", path.display()))
    }
}

/// Static change assembled from the command line and input files.
struct FileChange {
    paths: Vec<String>,
    approvers: Vec<String>,
}

#[async_trait]
impl ChangeSource for FileChange {
    async fn changed_paths(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.paths.clone())
    }

    async fn approvers(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.approvers.clone())
    }
}

/// Reports the verdict on the log, standing in for a commit-status API.
struct ConsoleStatus;

#[async_trait]
impl StatusSink for ConsoleStatus {
    async fn report(&self, state: VerdictState, description: &str) -> Result<(), BoxError> {
        info!(state = state.as_str(), description, "reporting status");
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(read_file(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

fn read_reviews(path: &Path) -> Result<Vec<Review>> {
    read_file(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_review)
        .collect()
}

fn parse_review(line: &str) -> Result<Review> {
    let (reviewer, state) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("expected `user state`, got `{line}`"))?;
    Ok(Review::new(reviewer, state.trim().parse()?))
}

async fn execute(cli: &Cli, sink: &ConsoleStatus) -> Result<Verdict> {
    let enforce_on = cli.enforce_list()?;
    let requirements = cli.requirements(&enforce_on)?;
    let directory = cli.team_directory()?;
    let change = FileChange {
        paths: cli.changed_paths()?,
        approvers: cli.approver_list()?,
    };
    Ok(ownergate::run(&requirements, &change, &directory, sink, cli.fail).await?)
}

/// Report a status for a run that aborted before producing a verdict. An
/// aborted run must never read as satisfied.
async fn report_aborted(error: &anyhow::Error, sink: &dyn StatusSink) {
    let Some(gate_error) = error.downcast_ref::<ownergate::Error>() else {
        return;
    };
    let (state, description) = gate_error.verdict();
    if let Err(report_error) = sink.report(state, &description).await {
        warn!(%state, error = %report_error, "failed to report the aborted run");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let sink = ConsoleStatus;

    match execute(&cli, &sink).await {
        Ok(verdict) => {
            for resolution in &verdict.evaluation.paths {
                match &resolution.outcome {
                    PathOutcome::Governed {
                        requirement,
                        satisfied,
                    } => {
                        let mark = if *satisfied { "satisfied" } else { "NOT satisfied" };
                        println!("{:<70}  {} {}", resolution.path, requirement, mark);
                    }
                    PathOutcome::Unconstrained => {
                        println!("{:<70}  (unconstrained)", resolution.path);
                    }
                }
            }
            println!("{}: {}", verdict.state, verdict.description);
            Ok(match verdict.state {
                VerdictState::Success | VerdictState::Pending => ExitCode::SUCCESS,
                VerdictState::Failure | VerdictState::Error => ExitCode::from(1),
            })
        }
        Err(error) => {
            report_aborted(&error, &sink).await;
            eprintln!("error: {error:#}");
            Ok(ExitCode::from(2))
        }
    }
}
