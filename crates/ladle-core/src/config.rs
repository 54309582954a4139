//! Ladle configuration.
//!
//! Loaded from `<config folder>/config.json`, or from the default-export object
//! literal of `config.mjs` / `config.js`. The JavaScript variants are read
//! statically: properties whose values are not literals (functions, calls,
//! identifiers) are ignored.
//!
//! ```js
//! export default {
//!   stories: "src/**/*.stories.{js,jsx,ts,tsx}",
//!   addons: { theme: { defaultState: "dark" } },
//! };
//! ```
//!
//! User values are deep-merged over [`Config::default`], so a config file
//! only needs to name what it changes.

use crate::discover::{eval_object_lenient, parse_source, scan_module};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file names in priority order.
pub const CONFIG_FILES: &[&str] = &["config.json", "config.mjs", "config.js"];

/// Default story glob.
pub const DEFAULT_STORIES: &str = "src/**/*.stories.{js,jsx,ts,tsx}";

/// Default dev server port.
pub const DEFAULT_PORT: u16 = 61000;

/// One glob or a list of globs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoriesPattern {
    One(String),
    Many(Vec<String>),
}

/// Settings of one UI addon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Addon {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Addon {
    fn new(enabled: bool, default_state: Option<Value>) -> Self {
        Self {
            enabled,
            default_state,
            options: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addons {
    pub a11y: Addon,
    pub action: Addon,
    pub control: Addon,
    pub ladle: Addon,
    pub mode: Addon,
    pub rtl: Addon,
    pub source: Addon,
    pub theme: Addon,
    pub width: Addon,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Addons {
    fn default() -> Self {
        let mut width = Addon::new(true, Some(json!(0)));
        width.options = Some(json!({
            "xsmall": 414,
            "small": 640,
            "medium": 768,
            "large": 1024,
        }));
        Self {
            a11y: Addon::new(false, None),
            action: Addon::new(true, Some(json!([]))),
            control: Addon::new(true, Some(json!({}))),
            ladle: Addon::new(true, None),
            mode: Addon::new(true, Some(json!("full"))),
            rtl: Addon::new(true, Some(json!(false))),
            source: Addon::new(true, Some(json!(false))),
            theme: Addon::new(true, Some(json!("light"))),
            width,
            extra: Map::new(),
        }
    }
}

/// Resolved ladle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Story glob(s), relative to the project root.
    pub stories: StoriesPattern,
    pub default_story: String,
    /// `"default"`, or an explicit list of story keys.
    pub story_order: Value,
    pub port: u16,
    pub out_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub addons: Addons,
    /// Keys this crate does not interpret, kept for the UI.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stories: StoriesPattern::One(DEFAULT_STORIES.to_string()),
            default_story: String::new(),
            story_order: Value::String("default".to_string()),
            port: DEFAULT_PORT,
            out_dir: "build".to_string(),
            base: None,
            addons: Addons::default(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Load the config from `config_folder`, falling back to defaults when no
    /// config file exists.
    pub fn load(config_folder: &Path) -> Result<Self, ConfigError> {
        let Some(path) = find_config_file(config_folder) else {
            debug!(folder = %config_folder.display(), "No config file, using defaults");
            return Ok(Self::default());
        };
        debug!(path = %path.display(), "Loading config");

        let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let user = read_user_config(&path, &source)?;
        Self::from_user_value(user).map_err(|source| ConfigError::Invalid { path, source })
    }

    /// Deep-merge `user` over the defaults.
    pub fn from_user_value(user: Value) -> Result<Self, serde_json::Error> {
        let mut merged = serde_json::to_value(Self::default())?;
        merge(&mut merged, user);
        serde_json::from_value(merged)
    }

    /// Story globs in declaration order.
    #[must_use]
    pub fn story_patterns(&self) -> Vec<String> {
        match &self.stories {
            StoriesPattern::One(pattern) => vec![pattern.clone()],
            StoriesPattern::Many(patterns) => patterns.clone(),
        }
    }
}

/// First existing config file in `config_folder`.
#[must_use]
pub fn find_config_file(config_folder: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| config_folder.join(name))
        .find(|path| path.is_file())
}

fn read_user_config(path: &Path, source: &str) -> Result<Value, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    if path.extension().is_some_and(|ext| ext == "json") {
        let value: Value = serde_json::from_str(source).map_err(|e| parse_error(e.to_string()))?;
        if !value.is_object() {
            return Err(parse_error("expected a JSON object".to_string()));
        }
        return Ok(value);
    }

    let name = path.to_string_lossy();
    let (_, module) = parse_source(&name, source).map_err(|e| parse_error(e.message))?;
    let scan = scan_module(&name, &module).map_err(|e| parse_error(e.message))?;
    let Some(object) = scan.default_object() else {
        return Err(parse_error(
            "expected `export default` of an object literal".to_string(),
        ));
    };
    Ok(eval_object_lenient(object))
}

/// Objects merge key by key; anything else in `overlay` replaces `base`.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
