//! Plugin hooks and the container that dispatches them.
//!
//! The hook surface is the subset of the Vite/Rollup plugin API the stories
//! pipeline needs: `resolve_id`, `load`, `transform` and `handle_hot_update`.

/// Result type for plugin hooks.
pub type HookResult<T> = Result<T, PluginError>;

/// Error from a plugin hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: String,
    /// Hook that failed.
    pub hook: &'static str,
    pub message: String,
    /// The host must stop (non-zero exit) instead of serving a fallback.
    pub fatal: bool,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            message: message.into(),
            fatal: false,
        }
    }

    /// An error that terminates the host.
    pub fn fatal(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            fatal: true,
            ..Self::new(plugin, hook, message)
        }
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.hook, self.message)
    }
}

impl std::error::Error for PluginError {}

/// Result of the `resolve_id` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveIdResult {
    pub id: String,
}

impl ResolveIdResult {
    pub fn resolved(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Result of the `load` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub code: String,
}

impl LoadResult {
    pub fn code(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Result of the `transform` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub code: String,
}

impl TransformResult {
    pub fn code(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Where a plugin runs relative to others. Mirrors Vite's `enforce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PluginEnforce {
    Pre,
    #[default]
    Normal,
    Post,
}

/// A file changed while the dev server is running.
#[derive(Debug, Clone)]
pub struct HotUpdateContext {
    /// The file that changed (absolute path).
    pub file: String,
    /// Modules the host already considers affected.
    pub modules: Vec<String>,
}

/// A bundler plugin. Every hook defaults to "not handled".
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Normal
    }

    /// Return `Some` to claim `specifier`; `None` lets the next plugin try.
    fn resolve_id(
        &self,
        _specifier: &str,
        _importer: Option<&str>,
    ) -> HookResult<Option<ResolveIdResult>> {
        Ok(None)
    }

    /// Return `Some` to provide the source of `id`.
    fn load(&self, _id: &str) -> HookResult<Option<LoadResult>> {
        Ok(None)
    }

    /// Return `Some` to replace the code; transforms chain in plugin order.
    fn transform(&self, _code: &str, _id: &str) -> HookResult<Option<TransformResult>> {
        Ok(None)
    }

    /// Return `Some(modules)` to override the affected modules list.
    fn handle_hot_update(&self, _ctx: &HotUpdateContext) -> HookResult<Option<Vec<String>>> {
        Ok(None)
    }
}

/// Ordered set of plugins: `Pre`, then `Normal`, then `Post`, each level in
/// insertion order.
#[derive(Default)]
pub struct PluginContainer {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
        // Stable, so insertion order survives within a level.
        self.plugins.sort_by_key(|p| p.enforce());
    }

    /// First plugin to resolve `specifier` wins.
    pub fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&str>,
    ) -> HookResult<Option<ResolveIdResult>> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.resolve_id(specifier, importer)? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// First plugin to load `id` wins.
    pub fn load(&self, id: &str) -> HookResult<Option<LoadResult>> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.load(id)? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Resolve then load, the way the host handles an import.
    pub fn resolve_and_load(
        &self,
        specifier: &str,
        importer: Option<&str>,
    ) -> HookResult<Option<LoadResult>> {
        let id = match self.resolve_id(specifier, importer)? {
            Some(resolved) => resolved.id,
            None => specifier.to_string(),
        };
        self.load(&id)
    }

    /// Run `code` through every plugin's transform.
    pub fn transform(&self, code: &str, id: &str) -> HookResult<String> {
        let mut current = code.to_string();
        for plugin in &self.plugins {
            if let Some(result) = plugin.transform(&current, id)? {
                current = result.code;
            }
        }
        Ok(current)
    }

    /// First non-`None` answer wins.
    pub fn handle_hot_update(&self, ctx: &HotUpdateContext) -> HookResult<Option<Vec<String>>> {
        for plugin in &self.plugins {
            if let Some(modules) = plugin.handle_hot_update(ctx)? {
                return Ok(Some(modules));
            }
        }
        Ok(None)
    }
}
