use tracing::debug;

use crate::config::{PathsConfig, RequirementConfig, TeamExpr};
use crate::pattern;

/// Parse an ownership-file document into requirement records, keeping only
/// rules whose path token appears verbatim in `enforce_on`.
///
/// Declaration order is preserved, which matters: later rules override
/// earlier ones during evaluation. Lines that do not parse as a rule are
/// skipped rather than failing the whole document.
pub fn parse(source: &str, enforce_on: &[impl AsRef<str>]) -> Vec<RequirementConfig> {
    source
        .lines()
        .filter_map(|line| parse_rule(line, enforce_on))
        .collect()
}

fn parse_rule(line: &str, enforce_on: &[impl AsRef<str>]) -> Option<RequirementConfig> {
    // Everything from the first `#` on is a comment.
    let line = match line.find('#') {
        Some(comment) => &line[..comment],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split_whitespace();
    let path = fields.next()?;
    if !enforce_on.iter().any(|enforced| enforced.as_ref() == path) {
        debug!(path, "skipping rule for unenforced path");
        return None;
    }

    let teams = fields
        .map(|team| TeamExpr::Team(team.to_string()))
        .collect::<Vec<_>>();
    debug!(path, ?teams, "parsed ownership rule");

    Some(RequirementConfig {
        name: None,
        paths: PathsConfig::Globs(vec![pattern::translate(path)]),
        teams,
    })
}
