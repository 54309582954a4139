//! Story file matching.
//!
//! Expands brace alternatives, walks the static directory prefix of each
//! pattern and matches files with `glob` semantics (`*` stays within one path
//! segment, `**` crosses segments).

use crate::error::DiscoveryError;
use glob::{MatchOptions, Pattern};
use rustc_hash::FxHashSet as HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directory names that are never traversed.
pub const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: !cfg!(windows),
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled set of story patterns anchored at a project root.
#[derive(Debug, Clone)]
pub struct StoryGlobs {
    root: PathBuf,
    globs: Vec<CompiledGlob>,
}

#[derive(Debug, Clone)]
struct CompiledGlob {
    /// Deepest directory without glob syntax; the walk starts here.
    base: PathBuf,
    pattern: Pattern,
    /// The pattern names a single file.
    literal: bool,
}

impl StoryGlobs {
    /// Compile `patterns` relative to `root`.
    ///
    /// `.` and `..` segments in the static part of a pattern are resolved, so
    /// `../shared/*.stories.tsx` is anchored at the sibling directory.
    pub fn new(root: &Path, patterns: &[String]) -> Result<Self, DiscoveryError> {
        let root = dunce::canonicalize(root).map_err(|source| DiscoveryError::Read {
            path: root.to_path_buf(),
            source,
        })?;

        let mut globs = Vec::new();
        for pattern in patterns {
            for expanded in expand_braces(pattern) {
                let expanded = expanded.replace('\\', "/");
                let (prefix, rest) = split_static(&expanded);
                let base = normalize_lexically(&root.join(prefix));

                let escaped = Pattern::escape(&normalize_path(&base));
                let full = match &rest {
                    Some(rest) => format!("{}/{rest}", escaped.trim_end_matches('/')),
                    None => escaped,
                };
                let compiled = Pattern::new(&full).map_err(|e| DiscoveryError::Pattern {
                    pattern: pattern.clone(),
                    message: e.msg.to_string(),
                })?;

                globs.push(CompiledGlob {
                    base,
                    pattern: compiled,
                    literal: rest.is_none(),
                });
            }
        }

        Ok(Self { root, globs })
    }

    /// Canonical project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` (absolute, or relative to the root) is matched.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let absolute = normalize_lexically(&self.root.join(path));
        if has_ignored_component(&absolute) {
            return false;
        }
        let normalized = normalize_path(&absolute);
        self.globs
            .iter()
            .any(|g| g.pattern.matches_with(&normalized, MATCH_OPTIONS))
    }

    /// Walk the filesystem and return every matched file.
    ///
    /// Paths are relative to the root (forward slashes) unless the file lies
    /// outside it. The result is deduplicated and sorted.
    pub fn collect(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut seen = HashSet::default();
        let mut files = Vec::new();

        for glob in &self.globs {
            if !glob.base.exists() {
                continue;
            }

            if glob.literal {
                if glob.base.is_file() {
                    let display = self.display_path(&glob.base);
                    if seen.insert(display.clone()) {
                        files.push(display);
                    }
                }
                continue;
            }

            let walker = WalkDir::new(&glob.base)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_type().is_dir()
                        || !IGNORED_DIRS.iter().any(|d| e.file_name() == *d)
                });

            for entry in walker {
                let entry = entry.map_err(|e| DiscoveryError::Read {
                    path: e
                        .path()
                        .map_or_else(|| glob.base.clone(), Path::to_path_buf),
                    source: e.into(),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let normalized = normalize_path(entry.path());
                if glob.pattern.matches_with(&normalized, MATCH_OPTIONS) {
                    let display = self.display_path(entry.path());
                    if seen.insert(display.clone()) {
                        files.push(display);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Root-relative path, or the absolute path for files outside the root.
    fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => normalize_path(rel),
            Err(_) => normalize_path(path),
        }
    }
}

/// Expand `patterns` under `root` into a deduplicated list of story files.
///
/// Zero matches is not an error.
pub fn match_stories(root: &Path, patterns: &[String]) -> Result<Vec<String>, DiscoveryError> {
    StoryGlobs::new(root, patterns)?.collect()
}

/// Expand brace alternatives: `a.{js,ts}` → `a.js`, `a.ts`. Nested groups are supported.
///
/// Groups without a top-level comma are left as literal text.
#[must_use]
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close)) = find_brace_group(pattern) else {
        return vec![pattern.to_string()];
    };
    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut out: Vec<String> = Vec::new();
    for alternative in split_top_level(&pattern[open + 1..close]) {
        for expanded in expand_braces(&format!("{prefix}{alternative}{suffix}")) {
            if !out.contains(&expanded) {
                out.push(expanded);
            }
        }
    }
    out
}

fn find_brace_group(pattern: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut open = None;
    let mut has_comma = false;
    let mut escaped = false;

    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => {
                if depth == 0 {
                    open = Some(i);
                    has_comma = false;
                }
                depth += 1;
            }
            ',' if depth == 1 => has_comma = true,
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 && has_comma {
                    return open.map(|o| (o, i));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// Split a pattern into its leading segments without glob syntax and the
/// remainder. The remainder is `None` when the pattern names a single file.
fn split_static(pattern: &str) -> (String, Option<String>) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let magic = segments
        .iter()
        .position(|s| s.contains(|c| matches!(c, '*' | '?' | '[')));
    match magic {
        Some(idx) => {
            let prefix = segments[..idx].join("/");
            let prefix = if prefix.is_empty() && pattern.starts_with('/') {
                "/".to_string()
            } else {
                prefix
            };
            (prefix, Some(segments[idx..].join("/")))
        }
        None => (pattern.to_string(), None),
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn has_ignored_component(path: &Path) -> bool {
    path.components()
        .any(|c| IGNORED_DIRS.iter().any(|d| c.as_os_str() == *d))
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
