//! Story file instrumentation.
//!
//! Every story module gets an HMR accept handler that notifies the ladle
//! runtime (`story-hmr`) so addons can re-run after an edit. Stories created
//! with `Template.bind({})` cannot be hot-swapped by React Refresh, so those
//! modules additionally invalidate themselves before every update.

use crate::generate::codegen::js_string;
use regex_lite::Regex;
use std::path::{Component, Path};
use std::sync::OnceLock;

/// Substring that marks a module id as a story file.
pub const STORY_MARKER: &str = ".stories.";

const INVALIDATE_HOOK: &str = r#"if (import.meta.hot) {
  import.meta.hot.on("vite:beforeUpdate", () => {
    import.meta.hot.invalidate();
  });
}"#;

const ACCEPT_HOOK: &str = r"if (import.meta.hot) {
  import.meta.hot.accept(() => {
    storyUpdated();
  });
}";

/// Whether the module id names a story file. Query strings are ignored.
#[must_use]
pub fn is_story_file(id: &str) -> bool {
    strip_query(id).contains(STORY_MARKER)
}

/// No-argument `.bind()` or `.bind({})`, whitespace allowed.
const BIND_PATTERN: &str = r"\.bind\(\s*(?:\{\s*\})?\s*\)";

fn bind_regex() -> &'static Regex {
    static BIND: OnceLock<Regex> = OnceLock::new();
    BIND.get_or_init(|| Regex::new(BIND_PATTERN).expect("BIND_PATTERN is a valid regex"))
}

/// Whether `code` calls `.bind()` or `.bind({})`.
#[must_use]
pub fn has_unstable_binding(code: &str) -> bool {
    bind_regex().is_match(code)
}

/// Import path of the runtime directory as seen from `file_path`.
///
/// Always starts with `./` or `../` and uses forward slashes.
#[must_use]
pub fn runtime_import_path(file_path: &str, runtime_dir: &Path) -> String {
    let file_path = Path::new(strip_query(file_path));
    let from = file_path.parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(runtime_dir, from)
        .unwrap_or_else(|| runtime_dir.to_path_buf());

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect();
    let joined = parts.join("/");

    if joined.is_empty() {
        ".".to_string()
    } else if joined.starts_with("../") || joined == ".." {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Instrument a story module. Non-story modules are returned unchanged.
///
/// The output always starts with `code` followed by a newline.
#[must_use]
pub fn transform(code: &str, file_path: &str, runtime_dir: &Path) -> String {
    if !is_story_file(file_path) {
        return code.to_string();
    }

    let mut out = String::with_capacity(code.len() + 256);
    out.push_str(code);
    out.push('\n');
    if has_unstable_binding(code) {
        out.push_str(INVALIDATE_HOOK);
        out.push('\n');
    }
    let specifier = format!("{}/story-hmr", runtime_import_path(file_path, runtime_dir));
    out.push_str(&format!(
        "import {{ storyUpdated }} from {};\n",
        js_string(&specifier)
    ));
    out.push_str(ACCEPT_HOOK);
    out.push('\n');
    out
}

fn strip_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}
