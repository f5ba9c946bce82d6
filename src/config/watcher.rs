//! Configuration file watcher.
//!
//! Changes never touch a running server in place: the watcher only delivers the
//! freshly loaded [`Config`]; the owner applies it with a stop/start cycle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::Config;

/// Watches one configuration file and emits each valid, changed version.
pub struct ConfigWatcher {
    path: PathBuf,
    current: Option<Config>,
}

impl ConfigWatcher {
    /// `current` is the configuration already in effect; identical reloads are skipped.
    pub fn new(path: &Path, current: Option<Config>) -> Self {
        Self {
            path: path.to_path_buf(),
            current,
        }
    }

    /// Start watching. Keep the returned watcher alive for as long as updates are wanted.
    pub fn spawn(self) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<Config>), notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.path.clone();
        let file_name = path.file_name().map(|name| name.to_os_string());
        let mut last = self.current;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                let touches_config = event
                    .paths
                    .iter()
                    .any(|changed| changed.file_name().map(|n| n.to_os_string()) == file_name);
                if !touches_config || !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }

                match load_config(&path) {
                    Ok(config) if last.as_ref() == Some(&config) => {
                        tracing::debug!(path = %path.display(), "Config unchanged, skipping reload");
                    }
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Config change detected");
                        last = Some(config.clone());
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                    }
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        // Editors often replace the file, so watch its directory.
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok((watcher, rx))
    }
}
