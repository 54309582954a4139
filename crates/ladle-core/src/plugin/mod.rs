//! Plugin host integration.

mod container;
mod stories;

pub use container::{
    HookResult, HotUpdateContext, LoadResult, Plugin, PluginContainer, PluginEnforce, PluginError,
    ResolveIdResult, TransformResult,
};
pub use stories::{
    failure_lines, BuildMode, StoriesPlugin, DEFAULT_RUNTIME_DIR, DOCS_URL,
    RESOLVED_VIRTUAL_MODULE_ID, VIRTUAL_MODULE_ID,
};
