// Copyright (c) 2025-2026 Livesync and contributors

// SPDX-License-Identifier: MIT
// All contributions are certified under the DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Watch agent.

use inotify::WatchDescriptor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

pub mod changes;
mod error;
pub mod filter;
mod monitor;
pub mod plan;
mod tree;

pub use changes::{Changes, Mark};
pub use error::{Error, Result};
pub use filter::{Filter, Preset};
pub use plan::Action;

use monitor::Monitor;
use tree::Tree;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Outcome of one coalescing cycle.
#[derive(Debug)]
pub enum Batch {
    /// A closed batch of changes.
    Changes(Changes),
    /// The kernel event queue overflowed; events were lost and the caller
    /// must rebuild the watch set and resynchronize everything.
    Overflow,
    /// The stop flag was raised while waiting for events.
    Interrupted,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Watch agent.
///
/// The agent owns the mutable state of the translation core: the monitor
/// holding the kernel-side watches, the watch tree owning their handles, and
/// the ignore filter consulted for both watching and event processing. It is
/// strictly single-threaded - the only time primitive it needs is a bounded
/// sleep, used to detect quiescence.
///
/// One call to [`Agent::next_batch`] performs one full coalescing cycle:
/// wait for a first event, keep draining until the file system has been
/// quiet for one interval, then fold the collected events into a change
/// tree, growing and shrinking the watch set along the way. The caller turns
/// the change tree into sync actions with [`plan::actions`] and executes
/// them however it sees fit.
///
/// # Examples
///
/// ```no_run
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use std::path::PathBuf;
/// use std::sync::atomic::AtomicBool;
/// use std::time::Duration;
/// use livesync_watch::{Agent, Batch, Filter};
///
/// // Create watch agent and establish watches
/// let filter = Filter::new();
/// let mut agent = Agent::new(
///     PathBuf::from("/srv/data"),
///     filter,
///     Duration::from_secs(1),
///     false,
/// )?;
/// agent.scan()?;
///
/// // Collect one batch of changes
/// let stop = AtomicBool::new(false);
/// if let Batch::Changes(changes) = agent.next_batch(&stop)? {
///     println!("{changes:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    /// Source root.
    root: PathBuf,
    /// Watch monitor.
    monitor: Monitor,
    /// Watch tree.
    tree: Tree<WatchDescriptor>,
    /// Ignore filter.
    filter: Filter,
    /// Quiescence interval.
    interval: Duration,
    /// Whether deletions enter the change tree.
    delete: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Agent {
    /// Creates a watch agent.
    ///
    /// The agent starts out without any watches - call [`Agent::scan`] to
    /// establish them. When `delete` is disabled, deletions still drive
    /// watch teardown but never contribute sync actions.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel refuses to create an inotify instance.
    pub fn new(
        root: PathBuf, filter: Filter, interval: Duration, delete: bool,
    ) -> Result<Self> {
        Ok(Self {
            root,
            monitor: Monitor::new()?,
            tree: Tree::new(),
            filter,
            interval,
            delete,
        })
    }

    /// Establishes watches on the entire source tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deaf`] if not a single directory could be watched,
    /// as the agent would otherwise wait forever for events that can never
    /// arrive. Per-directory failures are only logged.
    pub fn scan(&mut self) -> Result {
        let root = self.root.clone();
        self.watch(&root)?;
        if self.tree.is_empty() {
            return Err(Error::Deaf);
        }
        Ok(())
    }

    /// Watches the directory at the given path, recursively.
    ///
    /// Every directory under the path that does not match the ignore filter
    /// is registered with the kernel and recorded in the watch tree; ignored
    /// directories are pruned from the walk together with everything beneath
    /// them. This method doubles as the re-scan run for freshly created
    /// directories, whose entries may predate their watch.
    ///
    /// Watch registration failures are logged and skipped - a directory that
    /// cannot be watched must not stop coverage of its siblings.
    ///
    /// # Errors
    ///
    /// This method only fails on structural errors of the walk itself, not
    /// on per-directory registration failures.
    pub fn watch(&mut self, path: &Path) -> Result {
        let Self { root, monitor, tree, filter, .. } = self;
        let walker = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let rel = entry.path().strip_prefix(&*root);
                !rel.is_ok_and(|rel| filter.is_ignored(rel))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("walk failed: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            // Walks always start at or below the source root, so the prefix
            // strip cannot fail
            let Ok(rel) = entry.path().strip_prefix(&*root) else {
                continue;
            };

            match monitor.add(entry.path()) {
                Ok(handle) => {
                    trace!(path = %entry.path().display(), "watching");

                    // Re-scans revisit directories that are already watched,
                    // in which case the kernel hands back the same handle;
                    // only a genuinely different stale handle is cancelled
                    if let Some(stale) = tree.insert(rel, handle.clone()) {
                        if stale != handle {
                            monitor.remove(stale);
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        path = %entry.path().display(),
                        "cannot watch: {err}"
                    );
                }
            }
        }
        Ok(())
    }

    /// Unwatches the subtree at the given path.
    ///
    /// All handles beneath and at the path are cancelled, descendants first.
    /// Must happen as soon as a directory is deleted or moved away - the
    /// directory recorded for each handle has gone stale, and leaving the
    /// watches in place corrupts path resolution for every later event.
    pub fn unwatch(&mut self, path: &Path) {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return;
        };
        for handle in self.tree.remove(rel) {
            self.monitor.remove(handle);
        }
    }

    /// Returns the number of live watches.
    #[must_use]
    pub fn watches(&self) -> usize {
        self.tree.len()
    }

    /// Collects the next batch of changes.
    ///
    /// A batch begins when at least one event is available and closes after
    /// a full interval passes without new arrivals, which coalesces bursts -
    /// a compiler writing hundreds of files - into a single batch. While no
    /// events are available at all, the agent sleeps one interval at a time.
    /// The stop flag is checked before every sleep, while waiting as well as
    /// while draining, so one request suffices even mid-batch.
    ///
    /// Folding the closed batch applies the ignore filter, grows the watch
    /// tree for created directories, tears it down for deleted or moved-away
    /// ones, and records everything else as a plain change. A zero interval
    /// degenerates to one drain per batch but still terminates.
    ///
    /// # Errors
    ///
    /// Read errors from the event stream are forwarded.
    pub fn next_batch(&mut self, stop: &AtomicBool) -> Result<Batch> {
        // Wait for the first event of the batch
        let mut pending = loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(Batch::Interrupted);
            }
            let events = self.monitor.drain()?;
            if self.monitor.take_overflow() {
                return Ok(Batch::Overflow);
            }
            if !events.is_empty() {
                break events;
            }
            thread::sleep(self.interval);
        };

        // Keep draining until the file system is quiescent; the stop flag
        // is honored here as well, so a shutdown request arriving in the
        // middle of a long burst doesn't have to wait for the batch to close
        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(Batch::Interrupted);
            }
            thread::sleep(self.interval);
            let more = self.monitor.drain()?;
            if self.monitor.take_overflow() {
                return Ok(Batch::Overflow);
            }
            if more.is_empty() {
                break;
            }
            pending.extend(more);
        }
        debug!("batch closed with {} events", pending.len());

        // Fold the batch into a change tree, in arrival order
        let mut changes = Changes::new();
        for event in pending {
            self.fold(&event, &mut changes);
        }
        Ok(Batch::Changes(changes))
    }

    /// Rebuilds the entire watch set.
    ///
    /// Used after an event queue overflow, when an unknown number of events
    /// was lost: every watch is cancelled, events queued for the old watches
    /// are discarded, and the source tree is scanned from scratch. The
    /// caller is expected to follow up with a full resynchronization.
    ///
    /// # Errors
    ///
    /// Same as [`Agent::scan`].
    pub fn rescan(&mut self) -> Result {
        for handle in self.tree.remove(Path::new("")) {
            self.monitor.remove(handle);
        }
        let _ = self.monitor.drain();
        self.monitor.take_overflow();
        self.scan()
    }

    /// Folds a single event into the change tree.
    fn fold(&mut self, event: &monitor::Event, changes: &mut Changes) {
        let Ok(rel) = event.path.strip_prefix(&self.root) else {
            return;
        };
        if self.filter.is_ignored(rel) {
            return;
        }

        if event.is_mkdir() {
            // Entries may already exist inside the new directory by the time
            // the event is processed; the scan picks them up
            if let Err(err) = self.watch(&event.path) {
                warn!(path = %event.path.display(), "re-scan failed: {err}");
            }
            changes.mark(rel, Mark::CreatedDir);
        } else if event.is_removal() {
            if event.is_dir() {
                self.unwatch(&event.path);
            }

            // A pure deletion contributes a sync action only when deletion
            // propagation is enabled; watch teardown happens either way
            if self.delete {
                changes.mark(rel, Mark::Deleted);
            }
        } else {
            changes.touch(rel);
        }
    }
}
