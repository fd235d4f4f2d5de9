use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::parser;
use crate::requirement::Requirement;

/// Input dialect of a requirements document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementsFormat {
    /// Ownership-file lines (`pattern owner owner...`), restricted to an
    /// enforced path list.
    Codeowners,
    /// A YAML list of requirement records.
    Yaml,
}

/// Pick the dialect for a requirements file from its path. Files named
/// `CODEOWNERS` (conventionally at the repository root, `.github/` or `docs/`)
/// parse as ownership files; everything else parses as YAML.
pub fn detect_format(path: &Path) -> RequirementsFormat {
    if path.file_name() == Some(OsStr::new("CODEOWNERS")) {
        RequirementsFormat::Codeowners
    } else {
        RequirementsFormat::Yaml
    }
}

/// One raw requirement record, as read from a requirements document.
///
/// This is the declarative form; [`Requirement::new`] turns it into the
/// evaluable form with compiled patterns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequirementConfig {
    /// Display name. Unnamed requirements get a positional `#i` name.
    #[serde(default)]
    pub name: Option<String>,
    pub paths: PathsConfig,
    /// Teams whose review satisfies this requirement. An empty list makes the
    /// requirement unconditionally satisfied, which is how ownership rules
    /// without owners un-require paths matched by earlier rules.
    pub teams: Vec<TeamExpr>,
}

/// The `paths` field of a requirement: either the `unmatched` sentinel or an
/// ordered list of glob patterns.
#[derive(Debug, Clone, PartialEq)]
pub enum PathsConfig {
    /// Applies to any path no other requirement has claimed.
    Unmatched,
    /// Ordered glob patterns; a `!` prefix negates a pattern.
    Globs(Vec<String>),
}

impl<'de> Deserialize<'de> for PathsConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PathsVisitor;

        impl<'de> Visitor<'de> for PathsVisitor {
            type Value = PathsConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-empty array of strings, or the string \"unmatched\"")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value == "unmatched" {
                    Ok(PathsConfig::Unmatched)
                } else {
                    Err(E::custom(
                        "paths must be a non-empty array of strings, or the string \"unmatched\"",
                    ))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut globs = Vec::new();
                while let Some(glob) = seq.next_element::<String>()? {
                    globs.push(glob);
                }
                Ok(PathsConfig::Globs(globs))
            }
        }

        deserializer.deserialize_any(PathsVisitor)
    }
}

/// A reviewer filter expression: a team name, or an `any-of`/`all-of` node
/// over further expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum TeamExpr {
    /// A team identifier, or `@user` for a single-member virtual team.
    Team(String),
    /// Satisfied by approvers from any branch.
    AnyOf(Vec<TeamExpr>),
    /// Satisfied only when every branch contributes at least one approver.
    AllOf(Vec<TeamExpr>),
}

impl<'de> Deserialize<'de> for TeamExpr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TeamExprVisitor;

        impl<'de> Visitor<'de> for TeamExprVisitor {
            type Value = TeamExpr;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a team name or a single-keyed object")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TeamExpr::Team(value.to_string()))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let Some(operation) = map.next_key::<String>()? else {
                    return Err(de::Error::custom(
                        "expected a team name or a single-keyed object",
                    ));
                };
                let expr = match operation.as_str() {
                    "any-of" => TeamExpr::AnyOf(map.next_value()?),
                    "all-of" => TeamExpr::AllOf(map.next_value()?),
                    _ => return Err(de::Error::custom("operation must be all-of or any-of")),
                };
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom(
                        "expected a team name or a single-keyed object",
                    ));
                }
                Ok(expr)
            }
        }

        deserializer.deserialize_any(TeamExprVisitor)
    }
}

impl fmt::Display for TeamExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_op(f: &mut fmt::Formatter<'_>, op: &str, branches: &[TeamExpr]) -> fmt::Result {
            write!(f, "{op}(")?;
            for (i, branch) in branches.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{branch}")?;
            }
            f.write_str(")")
        }

        match self {
            TeamExpr::Team(name) => f.write_str(name),
            TeamExpr::AnyOf(branches) => write_op(f, "any-of", branches),
            TeamExpr::AllOf(branches) => write_op(f, "all-of", branches),
        }
    }
}

/// Parse a requirements document in the given dialect into evaluable
/// requirements, in declaration order.
pub fn build_requirements(
    source: &str,
    format: RequirementsFormat,
    enforce_on: &[impl AsRef<str>],
) -> Result<Vec<Requirement>, Error> {
    let configs = match format {
        RequirementsFormat::Codeowners => {
            debug!("parsing requirements as an ownership file");
            parser::parse(source, enforce_on)
        }
        RequirementsFormat::Yaml => {
            debug!("parsing requirements as yaml");
            serde_yaml::from_str::<Vec<RequirementConfig>>(source)
                .map_err(|source| Error::Requirements { source })?
        }
    };

    configs
        .into_iter()
        .enumerate()
        .map(|(index, config)| Requirement::new(index, config))
        .collect()
}

/// Read a requirements file, picking the dialect from its path.
pub fn load_requirements(
    path: impl AsRef<Path>,
    enforce_on: &[impl AsRef<str>],
) -> Result<Vec<Requirement>, Error> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| Error::io(path, source))?;
    build_requirements(&source, detect_format(path), enforce_on)
}

/// Parse an enforced-path document: a YAML array of path literals. An empty
/// document enforces nothing.
pub fn parse_enforce_on(source: &str) -> Result<Vec<String>, Error> {
    let value = serde_yaml::from_str::<serde_yaml::Value>(source)
        .map_err(|source| Error::Requirements { source })?;
    match value {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Sequence(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                serde_yaml::Value::String(path) => Ok(path),
                other => Err(Error::config(format!(
                    "enforce-on entries must be strings, got `{other:?}`"
                ))),
            })
            .collect(),
        _ => Err(Error::config("enforce-on should be an array")),
    }
}
