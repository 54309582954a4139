//! `ladle watch`: keep the story list up to date while files change.
//!
//! A background thread owns the `notify` watcher and forwards debounced
//! batches of changed paths over a tokio channel. Each batch goes through the
//! plugin's `handle_hot_update`; when the generated list is affected it is
//! regenerated and a summary is reported.

use super::Context;
use ladle_core::config::CONFIG_FILES;
use ladle_core::discover::IGNORED_DIRS;
use ladle_core::plugin::{failure_lines, HotUpdateContext, RESOLVED_VIRTUAL_MODULE_ID};
use ladle_core::{BuildMode, Plugin, StoriesPlugin};
use miette::{IntoDiagnostic, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Quiet period before a batch of changes is flushed.
const DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Serialize)]
struct WatchEvent<'a> {
    ok: bool,
    stories: usize,
    files: usize,
    duration_ms: u64,
    changed: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(mut ctx: Context, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(watch(&mut ctx, json))
}

async fn watch(ctx: &mut Context, json: bool) -> Result<()> {
    let mut plugin = ctx.plugin(BuildMode::Development);
    report(&plugin, &[], json);

    let (file_change_tx, mut file_change_rx) = mpsc::channel::<Vec<String>>(16);
    let watch_root = ctx.root.clone();
    std::thread::spawn(move || {
        if let Err(e) = watch_files(&watch_root, file_change_tx) {
            error!("File watcher error: {e}");
        }
    });
    info!(root = %ctx.root.display(), "Watching for story changes");

    loop {
        tokio::select! {
            changed = file_change_rx.recv() => {
                let Some(changed) = changed else {
                    break;
                };
                if touches_config(&ctx.config_folder, &changed) {
                    match ctx.reload_config() {
                        Ok(()) => {
                            info!("Config changed, reloading");
                            plugin = ctx.plugin(BuildMode::Development);
                        }
                        Err(e) => error!("Failed to reload config: {e}"),
                    }
                }
                if affects_list(&plugin, &ctx.config_folder, &changed) {
                    report(&plugin, &changed, json);
                } else {
                    debug!(files = changed.len(), "Ignoring unrelated changes");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watcher");
                break;
            }
        }
    }

    Ok(())
}

/// Whether any changed file requires the generated list to be rebuilt.
fn affects_list(plugin: &StoriesPlugin, config_folder: &Path, changed: &[String]) -> bool {
    changed.iter().any(|file| {
        // A new or removed components file changes the Provider import.
        if Path::new(file).starts_with(config_folder) {
            return true;
        }
        let update = HotUpdateContext {
            file: file.clone(),
            modules: Vec::new(),
        };
        match plugin.handle_hot_update(&update) {
            Ok(Some(modules)) => modules.iter().any(|m| m == RESOLVED_VIRTUAL_MODULE_ID),
            Ok(None) => false,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    })
}

/// Regenerate the list and report the outcome.
fn report(plugin: &StoriesPlugin, changed: &[String], json: bool) {
    let start = Instant::now();
    let result = plugin.discover();
    let duration_ms = start.elapsed().as_millis() as u64;

    let event = match &result {
        Ok(set) => {
            let files: BTreeSet<&str> = set.iter().map(|e| e.file_path.as_str()).collect();
            WatchEvent {
                ok: true,
                stories: set.len(),
                files: files.len(),
                duration_ms,
                changed,
                error: None,
            }
        }
        Err(err) => {
            for line in failure_lines(err) {
                error!("{line}");
            }
            WatchEvent {
                ok: false,
                stories: 0,
                files: 0,
                duration_ms,
                changed,
                error: Some(err.to_string()),
            }
        }
    };

    if json {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to serialize watch event: {e}"),
        }
    } else if event.ok {
        println!(
            "  {} stories in {} files ({}ms)",
            event.stories, event.files, event.duration_ms
        );
    }
}

/// Whether a config file in `config_folder` was written or removed.
fn touches_config(config_folder: &Path, changed: &[String]) -> bool {
    changed.iter().map(Path::new).any(|path| {
        path.parent() == Some(config_folder)
            && path
                .file_name()
                .is_some_and(|name| CONFIG_FILES.iter().any(|c| name == *c))
    })
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => IGNORED_DIRS.iter().any(|d| name == *d),
        _ => false,
    })
}

/// Forward debounced batches of changed paths until the receiver goes away.
fn watch_files(root: &Path, file_change_tx: mpsc::Sender<Vec<String>>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default()).into_diagnostic()?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .into_diagnostic()?;

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();

    loop {
        match rx.recv_timeout(DEBOUNCE) {
            Ok(Ok(event)) => {
                pending.extend(event.paths.into_iter().filter(|p| !is_ignored(p)));
            }
            Ok(Err(e)) => warn!("Watch error: {e}"),
            Err(RecvTimeoutError::Timeout) => {
                if pending.is_empty() {
                    continue;
                }
                let changed: Vec<String> = std::mem::take(&mut pending)
                    .into_iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                if file_change_tx.blocking_send(changed).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladle_core::Config;
    use std::fs;

    #[test]
    fn test_is_ignored() {
        assert!(is_ignored(Path::new("/p/node_modules/x/a.stories.tsx")));
        assert!(is_ignored(Path::new("/p/.git/HEAD")));
        assert!(!is_ignored(Path::new("/p/src/a.stories.tsx")));
    }

    #[test]
    fn test_affects_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config_folder = root.join(".ladle");
        let plugin = StoriesPlugin::new(Config::default(), &config_folder, &root);

        let story = root.join("src/a.stories.tsx").to_string_lossy().into_owned();
        let util = root.join("src/util.ts").to_string_lossy().into_owned();
        let provider = config_folder.join("components.tsx").to_string_lossy().into_owned();

        assert!(affects_list(&plugin, &config_folder, &[story]));
        assert!(!affects_list(&plugin, &config_folder, &[util.clone()]));
        assert!(affects_list(&plugin, &config_folder, &[util, provider]));
    }

    #[test]
    fn test_touches_config() {
        let folder = Path::new("/p/.ladle");
        let changed = |p: &str| vec![p.to_string()];

        assert!(touches_config(folder, &changed("/p/.ladle/config.json")));
        assert!(touches_config(folder, &changed("/p/.ladle/config.mjs")));
        assert!(!touches_config(folder, &changed("/p/.ladle/components.tsx")));
        assert!(!touches_config(folder, &changed("/p/src/config.json")));
    }

    #[test]
    fn test_reloaded_config_changes_story_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("src/a.stories.tsx"), "export const A = 1;").unwrap();
        fs::write(dir.path().join("docs/b.stories.tsx"), "export const B = 1;").unwrap();

        let mut ctx = Context::load(dir.path().to_path_buf(), Path::new(".ladle"), None).unwrap();
        let keys = |ctx: &Context| -> Vec<String> {
            let set = ctx.plugin(BuildMode::Development).discover().unwrap();
            set.keys().map(str::to_string).collect()
        };
        assert_eq!(keys(&ctx), vec!["A"]);

        fs::create_dir_all(&ctx.config_folder).unwrap();
        let config_file = ctx.config_folder.join("config.json");
        fs::write(&config_file, r#"{ "stories": "docs/**/*.stories.tsx" }"#).unwrap();
        let changed = vec![config_file.to_string_lossy().into_owned()];
        assert!(touches_config(&ctx.config_folder, &changed));

        ctx.reload_config().unwrap();
        assert_eq!(keys(&ctx), vec!["B"]);

        fs::write(&config_file, "{ nope").unwrap();
        assert!(ctx.reload_config().is_err());
        assert_eq!(keys(&ctx), vec!["B"]);
    }
}
