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

//! Watch monitor.

use ahash::HashMap;
use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use tracing::debug;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Watch monitor.
///
/// This is a small wrapper around an inotify instance that keeps a record of
/// the directory each watch descriptor points at. The kernel reports events
/// as a descriptor plus a basename, so the record is what turns them back
/// into full paths. The descriptors themselves are owned by the watch tree -
/// the monitor's index is a non-owning view that is kept in lockstep.
///
/// The instance is created in non-blocking mode, so draining never stalls
/// the agent. Two kernel conditions are handled inline: `IGNORED` events,
/// which report that the kernel itself dropped a watch and merely require
/// forgetting the stale directory, and `Q_OVERFLOW`, which reports that the
/// event queue overflowed and is latched into a flag the caller must check
/// after every drain.
pub struct Monitor {
    /// Inotify instance.
    inotify: Inotify,
    /// Read buffer.
    buffer: Vec<u8>,
    /// Watched directories, keyed by descriptor.
    paths: HashMap<WatchDescriptor, PathBuf>,
    /// Event queue overflow flag.
    overflow: bool,
}

// ----------------------------------------------------------------------------

/// Watch event.
///
/// The raw kernel mask is preserved, as the coalescer needs to distinguish
/// directory creations and removals from plain content changes.
#[derive(Debug)]
pub struct Event {
    /// Full path of the affected object.
    pub path: PathBuf,
    /// Raw event mask.
    pub mask: EventMask,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Monitor {
    /// Creates a watch monitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel refuses to create an inotify instance,
    /// which happens when the per-user instance limit is exhausted.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            inotify: Inotify::init()?,
            buffer: vec![0; 4096],
            paths: HashMap::default(),
            overflow: false,
        })
    }

    /// Watches the directory at the given path.
    ///
    /// The watch subscribes to the event kinds the agent cares about: writes
    /// being closed, moves in and out, deletions, attribute changes and
    /// creations. `ONLYDIR` makes the kernel reject the watch if the path
    /// stopped being a directory since the caller looked.
    ///
    /// # Errors
    ///
    /// Errors from watch registration are forwarded. Running out of watches
    /// surfaces here as `ENOSPC`.
    pub fn add(&mut self, path: &Path) -> io::Result<WatchDescriptor> {
        let mask = WatchMask::CLOSE_WRITE
            | WatchMask::MOVED_TO
            | WatchMask::MOVED_FROM
            | WatchMask::DELETE
            | WatchMask::ATTRIB
            | WatchMask::CREATE
            | WatchMask::ONLYDIR;

        // Record the directory, so events can be resolved to full paths
        let handle = self.inotify.watches().add(path, mask)?;
        self.paths.insert(handle.clone(), path.to_owned());
        Ok(handle)
    }

    /// Cancels the watch behind the given handle.
    ///
    /// Cancellation failures are expected and swallowed - when a watched
    /// directory is deleted, the kernel drops the watch before we get to
    /// cancel it, and removal of the stale descriptor fails with `EINVAL`.
    pub fn remove(&mut self, handle: WatchDescriptor) {
        self.paths.remove(&handle);
        if let Err(err) = self.inotify.watches().remove(handle) {
            debug!("watch already gone: {err}");
        }
    }

    /// Drains all currently available events.
    ///
    /// Events are resolved to full paths by joining the recorded directory
    /// of the originating watch with the event's basename. Events for
    /// descriptors we no longer know - stragglers queued before a watch was
    /// cancelled - are dropped.
    ///
    /// # Errors
    ///
    /// Read errors other than the non-blocking sentinel are forwarded.
    pub fn drain(&mut self) -> io::Result<Vec<Event>> {
        let mut events = Vec::new();
        loop {
            let batch = match self.inotify.read_events(&mut self.buffer) {
                Ok(batch) => batch,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => return Err(err),
            };

            // An empty read means the queue is exhausted
            let mut any = false;
            for event in batch {
                any = true;

                // Latch the overflow condition for the caller
                if event.mask.contains(EventMask::Q_OVERFLOW) {
                    self.overflow = true;
                    continue;
                }

                // The kernel dropped the watch itself, e.g. because the
                // directory was deleted; forget the stale directory
                if event.mask.contains(EventMask::IGNORED) {
                    self.paths.remove(&event.wd);
                    continue;
                }

                // Resolve the event to a full path
                if let Some(dir) = self.paths.get(&event.wd) {
                    let path = match event.name {
                        Some(name) => dir.join(name),
                        None => dir.clone(),
                    };
                    events.push(Event { path, mask: event.mask });
                }
            }
            if !any {
                break;
            }
        }
        Ok(events)
    }

    /// Returns and clears the event queue overflow flag.
    pub fn take_overflow(&mut self) -> bool {
        mem::take(&mut self.overflow)
    }
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Event {
    /// Checks whether the event concerns a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mask.contains(EventMask::ISDIR)
    }

    /// Checks whether the event is a directory creation or move-in.
    #[must_use]
    pub fn is_mkdir(&self) -> bool {
        self.is_dir()
            && self
                .mask
                .intersects(EventMask::CREATE | EventMask::MOVED_TO)
    }

    /// Checks whether the event is a deletion or move-out.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.mask
            .intersects(EventMask::DELETE | EventMask::MOVED_FROM)
    }
}
