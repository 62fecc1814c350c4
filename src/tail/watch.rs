//! Filesystem watch with polling fallback.
//!
//! Where the platform supports it, a `notify` watcher on the data directory
//! signals appends and bucket creation so polls happen promptly. A
//! fixed-interval fallback poll runs regardless, both for platforms without
//! native watching and as insurance against missed events. Either way this
//! only decides *when* the tailer polls; release pacing is untouched.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Decides when a tail poll is due.
pub struct DirWatcher {
    _watcher: Option<RecommendedWatcher>,
    events: Option<Receiver<notify::Result<notify::Event>>>,
    poll_interval: Duration,
    next_poll: Instant,
}

impl DirWatcher {
    /// Watch `dir`, falling back to pure interval polling if the watcher
    /// cannot be set up (unsupported platform, directory not yet created).
    pub fn new(dir: &Path, poll_interval: Duration, now: Instant) -> Self {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })
        .and_then(|mut watcher| {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            Ok(watcher)
        });

        match watcher {
            Ok(watcher) => Self {
                _watcher: Some(watcher),
                events: Some(rx),
                poll_interval,
                next_poll: now + poll_interval,
            },
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "filesystem watch unavailable, polling on a fixed interval"
                );
                Self {
                    _watcher: None,
                    events: None,
                    poll_interval,
                    next_poll: now,
                }
            }
        }
    }

    /// True when a poll is due, either because the directory changed or the
    /// fallback interval elapsed.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        let mut due = false;

        if let Some(events) = &self.events {
            loop {
                match events.try_recv() {
                    Ok(Ok(_)) => due = true,
                    Ok(Err(e)) => {
                        debug!(error = %e, "watch event error");
                        due = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.events = None;
                        break;
                    }
                }
            }
        }

        if now >= self.next_poll {
            due = true;
        }
        if due {
            self.next_poll = now + self.poll_interval;
        }
        due
    }
}
