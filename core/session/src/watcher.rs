//! Workspace filesystem watcher.
//!
//! Purely informational: it counts and logs activity inside the open
//! workspace so a shell can show that edits are being picked up. Vault
//! correctness never depends on it; the lock reconciliation rescans the
//! workspace from disk.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use inkvault_common::{Error, Result};

enum Msg {
    Fs(notify::Result<Event>),
    Stop,
}

/// Watches a workspace directory on a background thread.
pub struct WorkspaceWatcher {
    inner: Option<Inner>,
    events_seen: Arc<AtomicU64>,
}

struct Inner {
    watcher: RecommendedWatcher,
    tx: Sender<Msg>,
    done_rx: Receiver<()>,
    thread: JoinHandle<()>,
}

impl WorkspaceWatcher {
    /// Start watching `path` recursively.
    pub fn start(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let events_seen = Arc::new(AtomicU64::new(0));

        let fs_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = fs_tx.send(Msg::Fs(res));
            },
            Config::default(),
        )
        .map_err(watch_error)?;
        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(watch_error)?;

        let counter = events_seen.clone();
        let thread = std::thread::spawn(move || {
            run_loop(rx, counter);
            let _ = done_tx.send(());
        });

        debug!(path = %path.display(), "Workspace watcher started");
        Ok(Self {
            inner: Some(Inner {
                watcher,
                tx,
                done_rx,
                thread,
            }),
            events_seen,
        })
    }

    /// Number of filesystem events observed so far.
    pub fn events_seen(&self) -> u64 {
        self.events_seen.load(Ordering::Relaxed)
    }

    /// Stop watching, waiting at most `timeout` for the logging thread.
    ///
    /// Idempotent. A thread that misses the deadline is abandoned with a
    /// warning rather than blocking the caller; it exits on its own once
    /// its channel drains.
    pub fn stop(&mut self, timeout: Duration) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        // Dropping the OS watcher stops the event flow before the thread
        // is asked to finish.
        drop(inner.watcher);
        let _ = inner.tx.send(Msg::Stop);

        match inner.done_rx.recv_timeout(timeout) {
            Ok(()) => {
                let _ = inner.thread.join();
                debug!("Workspace watcher stopped");
            }
            Err(_) => {
                warn!(
                    "Watcher thread did not stop within {:?}; abandoning it",
                    timeout
                );
            }
        }
    }
}

fn run_loop(rx: Receiver<Msg>, events_seen: Arc<AtomicU64>) {
    while let Ok(msg) = rx.recv() {
        match msg {
            Msg::Fs(Ok(event)) => {
                events_seen.fetch_add(1, Ordering::Relaxed);
                debug!(kind = ?event.kind, paths = event.paths.len(), "Workspace activity");
            }
            Msg::Fs(Err(e)) => warn!("Watch error: {}", e),
            Msg::Stop => break,
        }
    }
}

fn watch_error(e: notify::Error) -> Error {
    Error::Io(std::io::Error::other(e))
}
