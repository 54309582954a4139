pub mod generate;
pub mod list;
pub mod transform;
pub mod watch;

use ladle_core::{BuildMode, Config, PluginContainer, StoriesPlugin};
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project state shared by every command.
#[derive(Debug)]
pub struct Context {
    pub root: PathBuf,
    pub config_folder: PathBuf,
    pub config: Config,
    pub runtime_dir: Option<PathBuf>,
}

impl Context {
    /// Resolve the config folder against `root` and load the config in it.
    pub fn load(root: PathBuf, config: &Path, runtime_dir: Option<PathBuf>) -> Result<Self> {
        let root = dunce::canonicalize(&root)
            .map_err(|e| miette!("Failed to resolve project root {}: {e}", root.display()))?;
        let config_folder = root.join(config);
        let config = Config::load(&config_folder).into_diagnostic()?;
        debug!(
            config_folder = %config_folder.display(),
            stories = ?config.story_patterns(),
            "Resolved config"
        );
        Ok(Self {
            root,
            config_folder,
            config,
            runtime_dir,
        })
    }

    /// Re-read the config folder. The current config is kept on error.
    pub fn reload_config(&mut self) -> Result<()> {
        self.config = Config::load(&self.config_folder).into_diagnostic()?;
        debug!(stories = ?self.config.story_patterns(), "Reloaded config");
        Ok(())
    }

    pub fn plugin(&self, mode: BuildMode) -> StoriesPlugin {
        let plugin = StoriesPlugin::new(self.config.clone(), &self.config_folder, &self.root)
            .mode(mode);
        match &self.runtime_dir {
            Some(dir) => plugin.runtime_dir(dir),
            None => plugin,
        }
    }

    /// A container holding only the stories plugin.
    pub fn container(&self, mode: BuildMode) -> PluginContainer {
        let mut container = PluginContainer::new();
        container.add(Box::new(self.plugin(mode)));
        container
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}
