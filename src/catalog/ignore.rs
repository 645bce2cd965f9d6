use globset::{GlobBuilder, GlobMatcher};

use crate::error::{EditorError, EditorResult};

/// Gitignore-style filter applied while scanning a locales folder.
///
/// Paths are relative to the root and use `/` separators: `fr` for a locale
/// directory, `fr/common.json` for a catalog file. The last matching pattern
/// decides; `!` re-includes.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogIgnore {
    patterns: Vec<IgnorePattern>,
}

#[derive(Debug, Clone)]
struct IgnorePattern {
    matcher: GlobMatcher,
    negated: bool,
    dir_only: bool,
    basename: bool,
}

impl CatalogIgnore {
    pub(crate) fn new(patterns: &[String]) -> EditorResult<Self> {
        let mut compiled = Vec::new();
        for raw in patterns {
            if let Some(pattern) = compile(raw)? {
                compiled.push(pattern);
            }
        }
        Ok(Self { patterns: compiled })
    }

    pub(crate) fn is_ignored(&self, rel: &str, is_dir: bool) -> bool {
        let name = rel.rsplit('/').next().unwrap_or(rel);
        let mut ignored = false;
        for pattern in &self.patterns {
            if pattern.dir_only && !is_dir {
                continue;
            }
            let candidate = if pattern.basename { name } else { rel };
            if pattern.matcher.is_match(candidate) {
                ignored = !pattern.negated;
            }
        }
        ignored
    }
}

fn compile(raw: &str) -> EditorResult<Option<IgnorePattern>> {
    let mut pattern = raw.trim();
    if pattern.is_empty() || pattern.starts_with('#') {
        return Ok(None);
    }

    let negated = match pattern.strip_prefix('!') {
        Some(rest) => {
            pattern = rest;
            true
        }
        None => false,
    };
    let dir_only = match pattern.strip_suffix('/') {
        Some(rest) => {
            pattern = rest;
            true
        }
        None => false,
    };
    let anchored = match pattern.strip_prefix('/') {
        Some(rest) => {
            pattern = rest;
            true
        }
        None => false,
    };
    if pattern.is_empty() {
        return Ok(None);
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|err| {
            EditorError::Configuration(format!("invalid ignore pattern '{}': {}", raw, err))
        })?
        .compile_matcher();

    Ok(Some(IgnorePattern {
        matcher,
        negated,
        dir_only,
        basename: !anchored && !pattern.contains('/'),
    }))
}
