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

//! Change tree.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Component, Path};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Change marker.
///
/// A marker records an event that occurred on the node itself, as opposed to
/// an event that occurred somewhere beneath it. Markers are last-write-wins:
/// a directory that is created and deleted within the same batch carries
/// only the deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    /// A directory was created at this node.
    CreatedDir,
    /// The object at this node was deleted or moved away.
    Deleted,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Change tree.
///
/// The change tree is the transient accumulator of one batch: it lives from
/// the moment the coalescer starts draining until the planner has consumed
/// it. Nodes are keyed by path segment, exactly like the watch tree. A node
/// without children and without a marker is a changed leaf; a node with
/// children but no marker is a structural ancestor kept only so deeper
/// changes have a spine to hang off.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use livesync_watch::{Changes, Mark};
///
/// // Record a batch of changes
/// let mut changes = Changes::new();
/// changes.touch(Path::new("src/main.c"));
/// changes.mark(Path::new("build"), Mark::CreatedDir);
///
/// assert!(!changes.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Changes {
    /// Tree root, corresponding to the source root.
    pub(crate) root: Node,
}

// ----------------------------------------------------------------------------

/// Change tree node.
#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Child nodes, keyed by path segment.
    pub(crate) children: BTreeMap<OsString, Node>,
    /// Event on the node itself.
    pub(crate) mark: Option<Mark>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Changes {
    /// Creates a change tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change at the given source-relative path.
    ///
    /// The node and its path spine are created if missing. No marker is set,
    /// so a bare touch stands for "the object at this path changed".
    pub fn touch(&mut self, path: &Path) {
        self.node(path);
    }

    /// Marks the node at the given source-relative path.
    pub fn mark(&mut self, path: &Path, mark: Mark) {
        self.node(path).mark = Some(mark);
    }

    /// Checks whether any change was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.mark.is_none()
    }

    /// Returns the node at the given path, creating it as needed.
    fn node(&mut self, path: &Path) -> &mut Node {
        let mut node = &mut self.root;
        for component in path.components() {
            if let Component::Normal(segment) = component {
                node = node.children.entry(segment.to_owned()).or_default();
            }
        }
        node
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
