//! Story discovery: match → extract → validate.
//!
//! Each stage is a plain function over the filesystem snapshot at call time;
//! nothing is cached between runs.

mod duplicates;
mod extract;
mod literal;
mod matcher;
mod naming;

pub use duplicates::validate;
pub use extract::{extract, extract_file, parse_source, scan_module, ModuleScan};
pub use literal::{eval_lenient, eval_object_lenient, eval_static, object_property, unwrap_expr};
pub use matcher::{expand_braces, match_stories, StoryGlobs, IGNORED_DIRS};
pub use naming::{normalize_key, story_key};

use serde::Serialize;

/// Line span of a story declaration (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLoc {
    pub start: usize,
    pub end: usize,
}

/// One story export found in a story file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDatum {
    /// Project-relative path (forward slashes), or absolute when outside the root.
    pub file_path: String,
    /// Name the story is exported under.
    pub export_name: String,
    /// `X.storyName` when assigned, otherwise the export name.
    pub story_name: String,
    /// `title` of the file's default export.
    pub title: Option<String>,
    /// Key used in `list`, `stories` and `storySource`.
    pub key: String,
    /// Underlying binding; aliases of one binding share it.
    pub local: String,
    /// Default-export `meta` overlaid with `X.meta`.
    pub meta: serde_json::Map<String, serde_json::Value>,
    pub loc: SourceLoc,
}

/// Stories in discovery order: file order, then declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntryDataSet {
    entries: Vec<EntryDatum>,
}

impl EntryDataSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: EntryDatum) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryDatum> {
        self.entries.iter()
    }

    /// Story keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }
}

impl From<Vec<EntryDatum>> for EntryDataSet {
    fn from(entries: Vec<EntryDatum>) -> Self {
        Self { entries }
    }
}

impl Extend<EntryDatum> for EntryDataSet {
    fn extend<T: IntoIterator<Item = EntryDatum>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl<'a> IntoIterator for &'a EntryDataSet {
    type Item = &'a EntryDatum;
    type IntoIter = std::slice::Iter<'a, EntryDatum>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
