//! The ladle plugin: serves `virtual:generated-list` and instruments story files.

use super::container::{
    HookResult, HotUpdateContext, LoadResult, Plugin, PluginEnforce, PluginError, ResolveIdResult,
    TransformResult,
};
use crate::config::Config;
use crate::discover::{extract, match_stories, validate, EntryDataSet, StoryGlobs};
use crate::error::GenerationError;
use crate::generate::{fallback_module, generate};
use crate::transform;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Import specifier of the generated story list.
pub const VIRTUAL_MODULE_ID: &str = "virtual:generated-list";

/// Resolved id; the `\0` prefix keeps other plugins away from it.
pub const RESOLVED_VIRTUAL_MODULE_ID: &str = "\0virtual:generated-list";

/// Printed after every discovery failure.
pub const DOCS_URL: &str = "https://ladle.dev/docs/stories#limitations";

/// Ladle UI sources (home of `story-hmr`), relative to the project root.
pub const DEFAULT_RUNTIME_DIR: &str = "node_modules/@ladle/react/lib/app/src";

const PLUGIN_NAME: &str = "ladle-plugin";

/// How discovery failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Serve the fallback module and keep the dev server running.
    #[default]
    Development,
    /// Fail the build.
    Production,
}

impl BuildMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::str::FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown build mode `{other}`")),
        }
    }
}

/// Operator-facing lines logged when discovery fails.
#[must_use]
pub fn failure_lines(err: &GenerationError) -> [String; 2] {
    [
        format!("Story discovering failed: {err}"),
        format!("More info: {DOCS_URL}"),
    ]
}

/// Story discovery wired into the plugin hooks.
#[derive(Debug, Clone)]
pub struct StoriesPlugin {
    config: Config,
    config_folder: PathBuf,
    root: PathBuf,
    mode: BuildMode,
    runtime_dir: PathBuf,
}

impl StoriesPlugin {
    /// A development-mode plugin for the project at `root`.
    pub fn new(config: Config, config_folder: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            runtime_dir: root.join(DEFAULT_RUNTIME_DIR),
            config,
            config_folder: config_folder.into(),
            root,
            mode: BuildMode::Development,
        }
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override where `story-hmr` lives. Relative paths are taken from the root.
    pub fn runtime_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.runtime_dir = self.root.join(dir);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn build_mode(&self) -> BuildMode {
        self.mode
    }

    /// Match, extract and validate the stories on disk right now.
    pub fn discover(&self) -> Result<EntryDataSet, GenerationError> {
        let patterns = self.config.story_patterns();
        let paths = match_stories(&self.root, &patterns)?;
        debug!(files = paths.len(), patterns = ?patterns, "Matched story files");
        let set = extract(&self.root, &paths)?;
        validate(&set)?;
        Ok(set)
    }

    /// Source of the generated list, or the pipeline error.
    pub fn generate_list(&self) -> Result<String, GenerationError> {
        let set = self.discover()?;
        generate(&set, &self.config_folder, &self.config)
    }

    /// Source of the generated list with the failure policy applied.
    ///
    /// Failures are logged; development serves [`fallback_module`], production
    /// returns a fatal error.
    pub fn load_generated_list(&self) -> HookResult<String> {
        let err = match self.generate_list() {
            Ok(code) => return Ok(code),
            Err(err) => err,
        };

        for line in failure_lines(&err) {
            error!("{line}");
        }
        match self.mode {
            BuildMode::Production => Err(PluginError::fatal(PLUGIN_NAME, "load", err.to_string())),
            BuildMode::Development => Ok(fallback_module(&err.to_string())),
        }
    }

    /// Transform a story module so edits reach the ladle runtime.
    #[must_use]
    pub fn transform_story(&self, code: &str, id: &str) -> String {
        transform::transform(code, &self.absolute_id(id), &self.runtime_dir)
    }

    fn absolute_id(&self, id: &str) -> String {
        if Path::new(id).is_absolute() {
            id.to_string()
        } else {
            self.root.join(id).to_string_lossy().into_owned()
        }
    }
}

impl Plugin for StoriesPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Pre
    }

    fn resolve_id(
        &self,
        specifier: &str,
        _importer: Option<&str>,
    ) -> HookResult<Option<ResolveIdResult>> {
        if specifier == VIRTUAL_MODULE_ID {
            return Ok(Some(ResolveIdResult::resolved(RESOLVED_VIRTUAL_MODULE_ID)));
        }
        Ok(None)
    }

    fn load(&self, id: &str) -> HookResult<Option<LoadResult>> {
        if id != RESOLVED_VIRTUAL_MODULE_ID {
            return Ok(None);
        }
        debug!(id = VIRTUAL_MODULE_ID, mode = self.mode.as_str(), "Generating story list");
        self.load_generated_list().map(|code| Some(LoadResult::code(code)))
    }

    fn transform(&self, code: &str, id: &str) -> HookResult<Option<TransformResult>> {
        if !transform::is_story_file(id) {
            return Ok(None);
        }
        Ok(Some(TransformResult::code(self.transform_story(code, id))))
    }

    fn handle_hot_update(&self, ctx: &HotUpdateContext) -> HookResult<Option<Vec<String>>> {
        let globs = StoryGlobs::new(&self.root, &self.config.story_patterns())
            .map_err(|e| PluginError::new(PLUGIN_NAME, "handle_hot_update", e.to_string()))?;
        if !globs.matches(Path::new(&ctx.file)) {
            return Ok(None);
        }

        debug!(file = %ctx.file, "Story file changed, invalidating story list");
        let mut modules = ctx.modules.clone();
        if !modules.iter().any(|m| m == RESOLVED_VIRTUAL_MODULE_ID) {
            modules.push(RESOLVED_VIRTUAL_MODULE_ID.to_string());
        }
        Ok(Some(modules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, source) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
        dir
    }

    fn plugin(dir: &tempfile::TempDir) -> StoriesPlugin {
        StoriesPlugin::new(Config::default(), dir.path().join(".ladle"), dir.path())
    }

    #[test]
    fn test_resolve_virtual_module() {
        let dir = project(&[]);
        let plugin = plugin(&dir);

        assert_eq!(
            plugin.resolve_id(VIRTUAL_MODULE_ID, None).unwrap(),
            Some(ResolveIdResult::resolved(RESOLVED_VIRTUAL_MODULE_ID))
        );
        assert_eq!(plugin.resolve_id("react", None).unwrap(), None);
        assert_eq!(plugin.load("/src/index.ts").unwrap(), None);
    }

    #[test]
    fn test_load_generated_list() {
        let dir = project(&[(
            "src/button.stories.tsx",
            "export default { title: 'Button' };\nexport const Primary = () => null;\n",
        )]);
        let loaded = plugin(&dir)
            .load(RESOLVED_VIRTUAL_MODULE_ID)
            .unwrap()
            .unwrap();
        assert!(loaded.code.contains(r#"export const list = ["Button/Primary"];"#));
        assert!(loaded.code.contains(r#"export const errorMessage = "";"#));
    }

    #[test]
    fn test_development_failure_serves_fallback() {
        let dir = project(&[("src/bad.stories.tsx", "export const = ;")]);
        let plugin = plugin(&dir);
        let err = plugin.generate_list().unwrap_err();

        let loaded = plugin
            .load(RESOLVED_VIRTUAL_MODULE_ID)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.code, fallback_module(&err.to_string()));
        assert!(loaded.code.contains("export const list = [];"));
    }

    #[test]
    fn test_production_failure_is_fatal() {
        let dir = project(&[
            ("src/a.stories.ts", "export const Primary = {};"),
            ("src/b.stories.ts", "export const Primary = {};"),
        ]);
        let err = plugin(&dir)
            .mode(BuildMode::Production)
            .load(RESOLVED_VIRTUAL_MODULE_ID)
            .unwrap_err();
        assert!(err.fatal);
        assert_eq!(err.hook, "load");
        assert!(err.message.contains("src/a.stories.ts"));
        assert!(err.message.contains("src/b.stories.ts"));
    }

    #[test]
    fn test_failure_lines() {
        let err: GenerationError =
            crate::error::ParseError::new("src/x.stories.tsx", "Unexpected token").into();
        assert_eq!(
            failure_lines(&err),
            [
                "Story discovering failed: src/x.stories.tsx: Unexpected token".to_string(),
                "More info: https://ladle.dev/docs/stories#limitations".to_string(),
            ]
        );
    }

    #[test]
    fn test_transform_hook() {
        let dir = project(&[]);
        let plugin = plugin(&dir).runtime_dir("runtime");

        assert_eq!(plugin.transform("x", "src/util.ts").unwrap(), None);
        let out = plugin
            .transform("x", "src/a.stories.tsx")
            .unwrap()
            .unwrap();
        assert!(out.code.starts_with("x\n"));
        assert!(out.code.contains(r#"from "../runtime/story-hmr";"#));
    }

    #[test]
    fn test_hot_update_invalidates_list() {
        let dir = project(&[("src/a.stories.tsx", "export const A = 1;")]);
        let plugin = plugin(&dir);
        let root = dunce::canonicalize(dir.path()).unwrap();

        let update = HotUpdateContext {
            file: root.join("src/new.stories.tsx").to_string_lossy().into_owned(),
            modules: vec!["/src/new.stories.tsx".to_string()],
        };
        assert_eq!(
            plugin.handle_hot_update(&update).unwrap(),
            Some(vec![
                "/src/new.stories.tsx".to_string(),
                RESOLVED_VIRTUAL_MODULE_ID.to_string()
            ])
        );

        let unrelated = HotUpdateContext {
            file: root.join("src/util.ts").to_string_lossy().into_owned(),
            modules: Vec::new(),
        };
        assert_eq!(plugin.handle_hot_update(&unrelated).unwrap(), None);
    }

    #[test]
    fn test_build_mode_from_str() {
        assert_eq!("production".parse::<BuildMode>(), Ok(BuildMode::Production));
        assert_eq!("dev".parse::<BuildMode>(), Ok(BuildMode::Development));
        assert!("staging".parse::<BuildMode>().is_err());
    }
}
