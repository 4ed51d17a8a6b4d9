// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::script::ScriptPatterns;

/// A build script was created, modified or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChange {
    pub path: PathBuf,
}

/// Handle for the filesystem watcher.
///
/// Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send a [`ScriptChange`] for every changed
/// path that matches `patterns`. Paths below `skip_dir` are ignored.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    patterns: ScriptPatterns,
    skip_dir: PathBuf,
    change_tx: mpsc::Sender<ScriptChange>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());
    let skip_dir = skip_dir.canonicalize().unwrap_or(skip_dir);

    let patterns = Arc::new(patterns);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("builddag: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("builddag: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!("received notify event: {:?}", event);

            for path in &event.paths {
                if !is_script_change(&async_root, &skip_dir, &patterns, path) {
                    continue;
                }
                debug!(script = ?path, "build script changed");
                if change_tx
                    .send(ScriptChange { path: path.clone() })
                    .await
                    .is_err()
                {
                    warn!("script change receiver dropped; stopping watcher loop");
                    return;
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

pub(crate) fn is_script_change(
    root: &Path,
    skip_dir: &Path,
    patterns: &ScriptPatterns,
    path: &Path,
) -> bool {
    if path.starts_with(skip_dir) {
        return false;
    }
    match relative_str(root, path) {
        Some(rel) => patterns.matches(&rel),
        None => {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            false
        }
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
