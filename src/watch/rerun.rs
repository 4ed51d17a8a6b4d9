// src/watch/rerun.rs

use std::future::Future;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use crate::watch::watcher::ScriptChange;

/// Run `on_change` once per batch of script changes until the channel
/// closes.
///
/// Runs never overlap. Every change received while a run is in progress
/// is folded into the next batch.
pub async fn rerun_on_change<F, Fut>(mut changes: mpsc::Receiver<ScriptChange>, mut on_change: F)
where
    F: FnMut(Vec<PathBuf>) -> Fut,
    Fut: Future<Output = ()>,
{
    while let Some(first) = changes.recv().await {
        let mut batch = vec![first.path];
        while let Ok(more) = changes.try_recv() {
            if !batch.contains(&more.path) {
                batch.push(more.path);
            }
        }
        debug!(changed = batch.len(), "rerunning after script changes");
        on_change(batch).await;
    }
    debug!("change channel closed; rerun loop finished");
}
