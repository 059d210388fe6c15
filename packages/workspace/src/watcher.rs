use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// Recursive watch over a projection root
///
/// Paths touched by create, modify (including rename) and remove events are
/// forwarded to `events`. Dropping the watcher ends the subscription.
pub struct ProjectWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ProjectWatcher {
    pub fn new(root: &Path, events: mpsc::UnboundedSender<PathBuf>) -> WatcherResult<Self> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !is_content_event(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        if events.send(path).is_err() {
                            tracing::debug!("Watch receiver dropped");
                            return;
                        }
                    }
                }
                Err(e) => tracing::error!("File watcher error: {}", e),
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        tracing::info!("Watching {}", root.display());

        Ok(Self {
            _watcher: watcher,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        tracing::info!("Stopped watching {}", self.root.display());
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
