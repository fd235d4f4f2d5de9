use std::collections::BTreeSet;
use std::fmt;

use futures::future::{self, BoxFuture, FutureExt};
use tracing::debug;

use crate::config::{PathsConfig, RequirementConfig, TeamExpr};
use crate::error::Error;
use crate::pattern::PathMatcher;
use crate::teams::{self, TeamContext};

/// One evaluable review requirement: a path predicate plus a reviewer filter.
pub struct Requirement {
    name: String,
    paths: Option<PathMatcher>,
    filter: Option<TeamExpr>,
}

impl Requirement {
    /// Build the evaluable form of a requirement record. `index` is the
    /// record's position in the document and names the requirement when the
    /// record carries no name of its own.
    pub fn new(index: usize, config: RequirementConfig) -> Result<Self, Error> {
        let name = match config.name {
            Some(name) if !name.is_empty() => name,
            _ => format!("#{index}"),
        };

        let paths = match config.paths {
            PathsConfig::Unmatched => None,
            PathsConfig::Globs(globs) => {
                if globs.is_empty() {
                    return Err(Error::config(
                        "paths must be a non-empty array of strings, or the string \"unmatched\"",
                    ));
                }
                Some(PathMatcher::new(&globs)?)
            }
        };

        // A requirement without teams requires nothing. It exists to
        // un-require paths a broader earlier rule matched, the way an
        // ownership rule without owners does. A non-empty team list is an
        // implicit top-level any-of.
        let filter = if config.teams.is_empty() {
            None
        } else {
            Some(TeamExpr::AnyOf(config.teams))
        };

        Ok(Self {
            name,
            paths,
            filter,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this requirement has no path patterns and instead claims any
    /// path no other requirement has claimed.
    pub fn is_unmatched_sentinel(&self) -> bool {
        self.paths.is_none()
    }

    /// Test whether this requirement governs `path`, recording the claim in
    /// `matched` when it does. `matched` holds the paths already claimed by
    /// any requirement, which is what the `unmatched` sentinel checks.
    pub(crate) fn applies_to(&self, path: &str, matched: &mut BTreeSet<String>) -> bool {
        let applies = match &self.paths {
            Some(matcher) => matcher.is_match(path),
            None => !matched.contains(path),
        };
        if applies {
            matched.insert(path.to_string());
        }
        applies
    }

    /// Whether `approvers` satisfies this requirement's reviewer filter.
    pub(crate) async fn is_satisfied(
        &self,
        approvers: &[String],
        ctx: TeamContext<'_>,
    ) -> Result<bool, Error> {
        let Some(filter) = &self.filter else {
            debug!(requirement = %self.name, "requirement has no teams, trivially satisfied");
            return Ok(true);
        };
        let matched = matching_approvers(filter, approvers, ctx).await?;
        debug!(requirement = %self.name, approvers = ?matched, "reviewer filter result");
        Ok(!matched.is_empty())
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.name)
            .field("paths", &self.paths)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Recursively evaluate a reviewer filter into the set of approvers it
/// accepts. A leaf keeps the approvers who are members of its team; `any-of`
/// unions its branches; `all-of` unions its branches unless one of them came
/// up empty, in which case the whole conjunction is empty. Branches are
/// evaluated concurrently.
fn matching_approvers<'a>(
    expr: &'a TeamExpr,
    approvers: &'a [String],
    ctx: TeamContext<'a>,
) -> BoxFuture<'a, Result<BTreeSet<String>, Error>> {
    async move {
        match expr {
            TeamExpr::Team(team) => {
                let members = teams::members_of(team, ctx).await?;
                let matched: BTreeSet<String> = approvers
                    .iter()
                    .filter(|approver| members.contains(approver))
                    .cloned()
                    .collect();
                debug!(team, ?matched, "approvers in team");
                Ok(matched)
            }
            TeamExpr::AnyOf(branches) => {
                let results = future::try_join_all(
                    branches
                        .iter()
                        .map(|branch| matching_approvers(branch, approvers, ctx)),
                )
                .await?;
                Ok(results.into_iter().flatten().collect())
            }
            TeamExpr::AllOf(branches) => {
                let results = future::try_join_all(
                    branches
                        .iter()
                        .map(|branch| matching_approvers(branch, approvers, ctx)),
                )
                .await?;
                if results.iter().any(BTreeSet::is_empty) {
                    return Ok(BTreeSet::new());
                }
                Ok(results.into_iter().flatten().collect())
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::{build_requirements, RequirementsFormat};
    use crate::teams::MemberCache;

    fn codeowners_requirement(path: &str, teams: &[&str]) -> Requirement {
        let source = format!("{path} {}", teams.join(" "));
        let mut requirements =
            build_requirements(&source, RequirementsFormat::Codeowners, &[path])
                .expect("valid requirement");
        assert_eq!(requirements.len(), 1);
        requirements.remove(0)
    }

    fn yaml_requirement(source: &str) -> Requirement {
        let config: RequirementConfig = serde_yaml::from_str(source).expect("valid yaml");
        Requirement::new(0, config).expect("valid requirement")
    }

    async fn satisfied(
        requirement: &Requirement,
        approvers: &[&str],
        rosters: &HashMap<String, Vec<String>>,
    ) -> bool {
        let approvers: Vec<String> = approvers.iter().map(ToString::to_string).collect();
        let cache = MemberCache::new();
        let ctx = TeamContext {
            directory: rosters,
            cache: &cache,
        };
        requirement
            .is_satisfied(&approvers, ctx)
            .await
            .expect("evaluation should not fail")
    }

    fn two_team_rosters() -> HashMap<String, Vec<String>> {
        HashMap::from([
            (
                "team1".to_string(),
                vec!["user1".to_string(), "user2".to_string()],
            ),
            (
                "team2".to_string(),
                vec!["user3".to_string(), "user4".to_string()],
            ),
        ])
    }

    #[test]
    fn test_star_matches_all_files() {
        let requirement = codeowners_requirement("*", &["team"]);
        let mut matched = BTreeSet::new();
        assert!(requirement.applies_to("anyfile", &mut matched));
        assert!(requirement.applies_to("subdir/file.txt", &mut matched));
        let claimed: Vec<&str> = matched.iter().map(String::as_str).collect();
        assert_eq!(claimed, vec!["anyfile", "subdir/file.txt"]);
    }

    #[test]
    fn test_extension_matches_anywhere_in_the_tree() {
        let requirement = codeowners_requirement("*.js", &["team"]);
        let mut matched = BTreeSet::new();
        assert!(!requirement.applies_to("hi", &mut matched));
        assert!(!requirement.applies_to("hi.txt", &mut matched));
        assert!(requirement.applies_to("hi.js", &mut matched));
        assert!(requirement.applies_to("subdir/hi.js", &mut matched));
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_directory_matches_all_subfiles() {
        let requirement = codeowners_requirement("/build/logs/", &["team"]);
        let mut matched = BTreeSet::new();
        assert!(!requirement.applies_to("build", &mut matched));
        assert!(requirement.applies_to("build/logs/", &mut matched));
        assert!(requirement.applies_to("build/logs/file.txt", &mut matched));
        assert!(requirement.applies_to("build/logs/subdir/hi.js", &mut matched));
        assert!(!requirement.applies_to("a_different_root/build/logs/subdir", &mut matched));
        assert_eq!(matched.len(), 3);
    }

    #[test]
    fn test_wildcard_after_directory_matches_one_level() {
        let requirement = codeowners_requirement("docs/*", &["team"]);
        let mut matched = BTreeSet::new();
        assert!(!requirement.applies_to("/docs", &mut matched));
        assert!(!requirement.applies_to("/docs/", &mut matched));
        assert!(requirement.applies_to("/docs/logs/", &mut matched));
        assert!(requirement.applies_to("/docs/file.txt", &mut matched));
        assert!(!requirement.applies_to("/docs/logs/file.txt", &mut matched));
        assert!(!requirement.applies_to("/docs/logs/subdir/hi.js", &mut matched));
        assert!(requirement.applies_to("/nested/docs/logs/", &mut matched));
        assert!(requirement.applies_to("/nested/docs/file.txt", &mut matched));
        assert_eq!(matched.len(), 4);
    }

    #[test]
    fn test_unanchored_directory_matches_at_any_level() {
        let requirement = codeowners_requirement("apps/", &["team"]);
        let mut matched = BTreeSet::new();
        assert!(!requirement.applies_to("/docs", &mut matched));
        assert!(requirement.applies_to("/apps", &mut matched));
        assert!(requirement.applies_to("/docs/apps", &mut matched));
        assert!(requirement.applies_to("/docs/apps/", &mut matched));
        assert!(!requirement.applies_to("/docs/file.txt", &mut matched));
        assert!(requirement.applies_to("/docs/apps/file.txt", &mut matched));
        assert!(requirement.applies_to("/deep/deep/deep/deep/deep/apps/hi.js", &mut matched));
        assert!(requirement.applies_to("/apps/deep/deep/deep/deep/deep/hi.js", &mut matched));
    }

    #[test]
    fn test_claimed_paths_are_recorded_verbatim() {
        let requirement = codeowners_requirement("apps/", &["team"]);
        let mut matched = BTreeSet::new();
        assert!(requirement.applies_to("/docs/apps/", &mut matched));
        assert!(matched.contains("/docs/apps/"));
        assert!(!matched.contains("docs/apps"));
    }

    #[test]
    fn test_sentinel_claims_only_unclaimed_paths() {
        let requirement = yaml_requirement("paths: unmatched\nteams: [team1]");
        assert!(requirement.is_unmatched_sentinel());

        let mut matched = BTreeSet::from(["claimed.txt".to_string()]);
        assert!(!requirement.applies_to("claimed.txt", &mut matched));
        assert!(requirement.applies_to("unclaimed.txt", &mut matched));
        assert!(matched.contains("unclaimed.txt"));
    }

    #[tokio::test]
    async fn test_any_one_specified_team_or_user_can_provide_review() {
        let rosters = two_team_rosters();

        let requirement = codeowners_requirement("file.txt", &["@user"]);
        assert!(satisfied(&requirement, &["user"], &rosters).await);

        let requirement = codeowners_requirement("file.txt", &["team1"]);
        assert!(satisfied(&requirement, &["user1"], &rosters).await);
        assert!(!satisfied(&requirement, &["user3"], &rosters).await);
        assert!(!satisfied(&requirement, &[], &rosters).await);

        let requirement = codeowners_requirement("file.txt", &["team1", "team2"]);
        assert!(satisfied(&requirement, &["user1"], &rosters).await);
        assert!(satisfied(&requirement, &["user3"], &rosters).await);
    }

    #[tokio::test]
    async fn test_all_of_needs_every_branch() {
        let requirement = yaml_requirement(
            "paths: ['**']\nteams:\n  - all-of: [team1, team2]\n",
        );
        let rosters = two_team_rosters();
        assert!(!satisfied(&requirement, &["user1"], &rosters).await);
        assert!(!satisfied(&requirement, &["user3"], &rosters).await);
        assert!(satisfied(&requirement, &["user1", "user3"], &rosters).await);
    }

    #[tokio::test]
    async fn test_nested_operations() {
        let requirement = yaml_requirement(
            "paths: ['**']\nteams:\n  - any-of:\n      - all-of: [team-a, team-b]\n      - team-c\n",
        );
        let rosters = HashMap::from([
            ("team-a".to_string(), vec!["alice".to_string()]),
            ("team-b".to_string(), vec!["bob".to_string()]),
            ("team-c".to_string(), vec!["carol".to_string()]),
        ]);

        assert!(!satisfied(&requirement, &["alice"], &rosters).await);
        assert!(!satisfied(&requirement, &["bob"], &rosters).await);
        assert!(satisfied(&requirement, &["alice", "bob"], &rosters).await);
        assert!(satisfied(&requirement, &["carol"], &rosters).await);
        assert!(!satisfied(&requirement, &["mallory"], &rosters).await);
    }

    #[tokio::test]
    async fn test_no_teams_means_trivially_satisfied() {
        let requirement = yaml_requirement("paths: ['docs/**']\nteams: []");
        assert!(satisfied(&requirement, &[], &HashMap::new()).await);
    }

    #[tokio::test]
    async fn test_unknown_team_surfaces_an_error() {
        let requirement = codeowners_requirement("file.txt", &["ghost-team"]);
        let cache = MemberCache::new();
        let rosters: HashMap<String, Vec<String>> = HashMap::new();
        let ctx = TeamContext {
            directory: &rosters,
            cache: &cache,
        };
        let err = requirement
            .is_satisfied(&["user1".to_string()], ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TeamFetch { ref team, .. } if team == "ghost-team"));
    }

    #[test]
    fn test_empty_paths_are_rejected() {
        let config: RequirementConfig =
            serde_yaml::from_str("paths: []\nteams: [team1]").expect("valid yaml");
        let err = Requirement::new(0, config).unwrap_err();
        assert!(err.to_string().contains("non-empty array"));
    }

    #[test]
    fn test_positional_names() {
        let config: RequirementConfig =
            serde_yaml::from_str("paths: ['**']\nteams: []").expect("valid yaml");
        assert_eq!(Requirement::new(3, config).unwrap().name(), "#3");

        let config: RequirementConfig =
            serde_yaml::from_str("name: docs\npaths: ['**']\nteams: []").expect("valid yaml");
        assert_eq!(Requirement::new(3, config).unwrap().name(), "docs");
    }
}
