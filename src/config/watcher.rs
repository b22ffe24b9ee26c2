//! Config file watching for hot reload of provider settings.
//!
//! notify delivers raw file events on its own thread; they are collapsed into
//! a single pending "changed" flag and the reload happens on the async side
//! after a short settle delay, so an editor's burst of writes loads once.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

const SETTLE: Duration = Duration::from_millis(250);

pub struct ConfigWatcher {
    path: PathBuf,
    changes: mpsc::Receiver<()>,
    // Dropping the notify handle stops event delivery.
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching `path`.
    pub fn new(path: &Path) -> Result<Self, notify::Error> {
        let (tx, changes) = mpsc::channel(1);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    // A full channel already holds a pending change.
                    let _ = tx.try_send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(Self {
            path: path.to_path_buf(),
            changes,
            _watcher: watcher,
        })
    }

    /// Wait for the next change that loads and validates.
    ///
    /// Broken edits are logged and skipped. Returns `None` once the watcher
    /// can deliver no more events.
    pub async fn next_config(&mut self) -> Option<GatewayConfig> {
        loop {
            self.changes.recv().await?;
            tokio::time::sleep(SETTLE).await;
            while self.changes.try_recv().is_ok() {}

            match load_config(&self.path) {
                Ok(config) => {
                    tracing::info!(path = %self.path.display(), "Config file reloaded");
                    return Some(config);
                }
                Err(e) => {
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        "Config reload failed, keeping current settings"
                    );
                }
            }
        }
    }
}
