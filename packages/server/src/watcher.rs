use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::warn;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// Editors often emit several events per save
const SETTLE: Duration = Duration::from_millis(100);

/// Recursive watch over a site directory, yielding batches of changed files
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<notify::Result<Event>>,
    ignored: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> WatcherResult<Self> {
        let (tx, rx) = unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            ignored: Vec::new(),
        })
    }

    /// Changes below `dir` are dropped, e.g. a build directory inside the site
    pub fn ignore(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ignored.push(dir.into());
        self
    }

    /// Wait for the next batch of created, modified or removed files.
    /// Returns `None` once the watcher has shut down.
    pub async fn next_change(&mut self) -> Option<Vec<PathBuf>> {
        loop {
            let first = self.receiver.recv().await?;
            let mut changed = self.relevant(first);

            tokio::time::sleep(SETTLE).await;
            while let Ok(event) = self.receiver.try_recv() {
                for path in self.relevant(event) {
                    if !changed.contains(&path) {
                        changed.push(path);
                    }
                }
            }

            if !changed.is_empty() {
                return Some(changed);
            }
        }
    }

    fn relevant(&self, event: notify::Result<Event>) -> Vec<PathBuf> {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Watch error");
                return Vec::new();
            }
        };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return Vec::new();
        }
        event
            .paths
            .into_iter()
            .filter(|path| !self.ignored.iter().any(|dir| path.starts_with(dir)))
            .collect()
    }
}
