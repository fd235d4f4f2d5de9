use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{BoxError, Error};

/// Collaborator that resolves a team identifier to its member list.
///
/// Implementations must fail for unknown teams rather than returning an
/// empty roster; an empty roster silently un-satisfies every requirement
/// naming the team, while an error aborts the run visibly.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn team_members(&self, team: &str) -> Result<Vec<String>, BoxError>;
}

/// Static rosters. This is the shape tests and offline runs use.
#[async_trait]
impl TeamDirectory for HashMap<String, Vec<String>> {
    async fn team_members(&self, team: &str) -> Result<Vec<String>, BoxError> {
        self.get(team)
            .cloned()
            .ok_or_else(|| format!("unknown team `{team}`").into())
    }
}

/// Append-only cache of resolved rosters, scoped to a single evaluation run.
/// Never evicted: team membership is assumed stable for the duration of a run.
pub struct MemberCache {
    rosters: RwLock<HashMap<String, Vec<String>>>,
}

impl MemberCache {
    pub fn new() -> Self {
        Self {
            rosters: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, team: &str) -> Option<Vec<String>> {
        self.rosters.read().expect("valid lock").get(team).cloned()
    }

    fn insert(&self, team: String, members: Vec<String>) {
        self.rosters
            .write()
            .expect("valid lock")
            .insert(team, members);
    }
}

impl Default for MemberCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory and cache pair threaded through reviewer-filter evaluation.
#[derive(Clone, Copy)]
pub(crate) struct TeamContext<'a> {
    pub(crate) directory: &'a dyn TeamDirectory,
    pub(crate) cache: &'a MemberCache,
}

/// Resolve the members of a team, consulting the cache first. A `@user`
/// identifier names a one-member virtual team and never touches the cache or
/// the directory.
pub(crate) async fn members_of(team: &str, ctx: TeamContext<'_>) -> Result<Vec<String>, Error> {
    if let Some(user) = team.strip_prefix('@') {
        return Ok(vec![user.to_string()]);
    }

    if let Some(members) = ctx.cache.get(team) {
        debug!(team, "roster cache hit");
        return Ok(members);
    }

    let members = ctx
        .directory
        .team_members(team)
        .await
        .map_err(|source| Error::TeamFetch {
            team: team.to_string(),
            source,
        })?;
    debug!(team, count = members.len(), "fetched team roster");

    // Concurrent misses for the same team may both land here; the rosters
    // are identical, so the second write is harmless.
    ctx.cache.insert(team.to_string(), members.clone());
    Ok(members)
}
