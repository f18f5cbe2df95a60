//! Config file watcher for hot reload.
//!
//! The host rebuilds its provider registry when the config changes. Sessions
//! that already started keep the chain they were built with; only sessions
//! started after the reload see the new providers.
//!
//! Editors often write a file several times per save, so events are
//! debounced before being reported.

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::{Duration, Instant};

/// Poll interval for the fallback backend.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Event indicating the config file has changed and needs reloading.
#[derive(Debug, Clone)]
pub struct ConfigReloadEvent {
    /// Path to the config file that changed.
    pub path: PathBuf,
}

/// Watches the config file for changes and sends reload events.
pub struct ConfigWatcher {
    /// Kept alive to maintain watching.
    _watcher: Box<dyn Watcher + Send>,
    event_receiver: Receiver<ConfigReloadEvent>,
    path: PathBuf,
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Debounce gate shared by the watcher callbacks.
#[derive(Clone)]
struct Debouncer {
    delay: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl Debouncer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns true when an event at `now` should be forwarded.
    fn admit(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.delay => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

fn is_relevant(event: &Event, filename: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|f| f == filename.as_os_str()))
}

fn make_event_handler(
    filename: OsString,
    canonical_path: PathBuf,
    debouncer: Debouncer,
    tx: Sender<ConfigReloadEvent>,
) -> impl Fn(std::result::Result<Event, notify::Error>) + Send + 'static {
    move |result| {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Config watcher error: {}", e);
                return;
            }
        };
        if !is_relevant(&event, &filename) {
            return;
        }
        if !debouncer.admit(Instant::now()) {
            log::trace!("Debouncing config reload event");
            return;
        }

        log::info!("Config file changed: {}", canonical_path.display());
        if let Err(e) = tx.send(ConfigReloadEvent {
            path: canonical_path.clone(),
        }) {
            log::error!("Failed to send config reload event: {}", e);
        }
    }
}

impl ConfigWatcher {
    /// Start watching `config_path`.
    ///
    /// Uses the platform's native backend and falls back to a `PollWatcher`
    /// when the native backend cannot be initialised (containers, network
    /// filesystems).
    ///
    /// # Errors
    /// Returns an error if the config file doesn't exist or watching fails on
    /// both backends.
    pub fn new(config_path: &Path, debounce_delay_ms: u64) -> Result<Self> {
        if !config_path.exists() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        }

        let canonical = config_path
            .canonicalize()
            .unwrap_or_else(|_| config_path.to_path_buf());
        let filename = canonical
            .file_name()
            .context("Config path has no filename")?
            .to_os_string();
        let parent_dir = canonical
            .parent()
            .context("Config path has no parent directory")?
            .to_path_buf();

        let (tx, rx) = channel();
        let debouncer = Debouncer::new(Duration::from_millis(debounce_delay_ms));

        let mut watcher: Box<dyn Watcher + Send> =
            match notify::recommended_watcher(make_event_handler(
                filename.clone(),
                canonical.clone(),
                debouncer.clone(),
                tx.clone(),
            )) {
                Ok(w) => {
                    log::debug!("Config watcher: using native backend");
                    Box::new(w)
                }
                Err(e) => {
                    log::warn!(
                        "Config watcher: native backend unavailable ({}); falling back to PollWatcher",
                        e
                    );
                    Box::new(
                        PollWatcher::new(
                            make_event_handler(filename, canonical.clone(), debouncer, tx),
                            NotifyConfig::default().with_poll_interval(POLL_INTERVAL),
                        )
                        .context("Failed to create fallback PollWatcher")?,
                    )
                }
            };

        watcher
            .watch(&parent_dir, RecursiveMode::NonRecursive)
            .with_context(|| {
                format!("Failed to watch config directory: {}", parent_dir.display())
            })?;

        log::info!("Config hot reload: watching {}", canonical.display());

        Ok(Self {
            _watcher: watcher,
            event_receiver: rx,
            path: canonical,
        })
    }

    /// Path being watched (canonicalised when possible).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check for a pending reload event without blocking.
    pub fn try_recv(&self) -> Option<ConfigReloadEvent> {
        self.event_receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for a reload event.
    ///
    /// Returns `None` on timeout or when the watcher backend has shut down.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ConfigReloadEvent> {
        match self.event_receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("Config watcher channel disconnected");
                None
            }
        }
    }
}
