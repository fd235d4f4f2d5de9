use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

use crate::error::Error;

/// Convert one ownership-rule path token into a glob over slash-separated
/// relative paths.
///
/// Ownership files and globs disagree about anchoring: a bare token like
/// `docs/*` floats (it may match at any depth), while a leading slash anchors
/// the token to the repository root. Changed paths carry no leading slash, so
/// anchoring just strips the `/`. A trailing slash names a directory and
/// everything beneath it, and a lone `*` means every path.
pub fn translate(token: &str) -> String {
    if token == "*" {
        return "**".to_string();
    }

    let mut glob = match token.strip_prefix('/') {
        Some(anchored) => anchored.to_string(),
        None => format!("**/{token}"),
    };

    if glob.ends_with('/') {
        glob.push_str("**");
    }

    glob
}

/// A compiled glob plus its negation flag. The `!` prefix is part of the
/// requirements dialect, not of the glob itself, so it is stripped before
/// compilation.
struct NegatableGlob {
    negated: bool,
    pattern: String,
    matcher: GlobMatcher,
}

impl NegatableGlob {
    fn new(pattern: &str) -> Result<Self, Error> {
        let (negated, stripped) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        if stripped.is_empty() {
            return Err(Error::config("path patterns must be non-empty"));
        }

        // `globset` wants at least one component below the directory for a
        // trailing `/**`, but `dir/**` must also cover `dir` itself here, so
        // the suffix compiles as an empty-or-globstar alternate. A prefix
        // already ending in `**` keeps the plain form: `globset` rejects a
        // recursive wildcard running into a brace.
        let compilable = match stripped.strip_suffix("/**") {
            Some(prefix) if !prefix.is_empty() && !prefix.ends_with("**") => {
                format!("{prefix}{{,/**}}")
            }
            _ => stripped.to_string(),
        };

        // `literal_separator` stops `*` from crossing directory boundaries,
        // which is what makes `**` and `*` mean different things here.
        // `empty_alternates` makes the empty brace branch legal.
        let glob = GlobBuilder::new(&compilable)
            .literal_separator(true)
            .empty_alternates(true)
            .build()
            .map_err(|source| Error::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            negated,
            pattern: stripped.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }
}

impl fmt::Debug for NegatableGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.pattern)
        } else {
            f.write_str(&self.pattern)
        }
    }
}

/// Path predicate over an ordered, non-empty list of negatable globs.
///
/// The globs are folded in declaration order: the first one seeds the result
/// (inverted when negated), and every later glob that matches overwrites it
/// with the inverse of its negation flag. The last matching glob therefore
/// decides, which lets `!`-patterns carve exceptions out of earlier ones.
pub struct PathMatcher {
    first: NegatableGlob,
    rest: Vec<NegatableGlob>,
}

impl PathMatcher {
    /// Compile an ordered pattern list. Fails on an empty list, an empty
    /// pattern, or a pattern `globset` rejects.
    pub fn new(patterns: &[String]) -> Result<Self, Error> {
        let mut globs = patterns.iter().map(|pattern| NegatableGlob::new(pattern));
        let first = match globs.next() {
            Some(first) => first?,
            None => return Err(Error::config("there must be at least one path")),
        };
        let rest = globs.collect::<Result<Vec<_>, _>>()?;
        Ok(Self { first, rest })
    }

    /// Test a slash-separated relative path. Leading and trailing slashes on
    /// the candidate are ignored, so `/docs/a.md` and `docs/sub/` behave like
    /// `docs/a.md` and `docs/sub`.
    pub fn is_match(&self, path: &str) -> bool {
        let candidate = path.trim_matches('/');
        let mut ret = if self.first.is_match(candidate) {
            !self.first.negated
        } else {
            self.first.negated
        };
        for glob in &self.rest {
            if glob.is_match(candidate) {
                ret = !glob.negated;
            }
        }
        ret
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        list.entry(&self.first);
        list.entries(&self.rest);
        list.finish()
    }
}
