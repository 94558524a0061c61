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

//! Watch tree.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::mem;
use std::path::{Component, Path};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Watch tree.
///
/// The tree mirrors the live directory structure under the source root, keyed
/// at each level by path segment. A node holds a handle if and only if the
/// corresponding directory is currently watched, and every handle is owned by
/// exactly one node, so detaching a subtree yields the complete set of
/// handles that must be cancelled.
///
/// The tree is generic over the handle type, which in production is a kernel
/// watch descriptor. Its length is the number of nodes holding a handle, not
/// the number of nodes - spine nodes created on the way to a deeper insert
/// carry no handle and don't count.
#[derive(Debug)]
pub struct Tree<H> {
    /// Tree root, corresponding to the source root.
    root: Node<H>,
    /// Number of held handles.
    len: usize,
}

// ----------------------------------------------------------------------------

/// Watch tree node.
#[derive(Debug)]
struct Node<H> {
    /// Child nodes, keyed by path segment.
    children: BTreeMap<OsString, Node<H>>,
    /// Handle of the watch on the directory itself.
    handle: Option<H>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<H> Tree<H> {
    /// Creates a watch tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a handle at the given source-relative path.
    ///
    /// Nodes along the path spine are created as needed. If the node already
    /// held a handle, the previous handle is returned - ownership passes back
    /// to the caller, who decides whether it must be cancelled.
    pub fn insert(&mut self, path: &Path, handle: H) -> Option<H> {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.children.entry(segment.to_owned()).or_default();
        }

        // Count the handle unless it replaces one
        let previous = node.handle.replace(handle);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Detaches the subtree at the given source-relative path.
    ///
    /// Returns all handles held by the subtree in post-order, descendants
    /// first and the subtree root last, so watches are cancelled bottom-up.
    /// An empty path detaches the entire tree, including the root handle.
    pub fn remove(&mut self, path: &Path) -> Vec<H> {
        let mut handles = Vec::new();
        if let Some(node) = self.detach(path) {
            collect(node, &mut handles);
        }
        self.len -= handles.len();
        handles
    }

    /// Checks whether a handle is held at the given source-relative path.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        let mut node = &self.root;
        for segment in segments(path) {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.handle.is_some()
    }

    /// Returns the number of held handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether no handle is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Detaches and returns the node at the given path, if present.
    fn detach(&mut self, path: &Path) -> Option<Node<H>> {
        let mut spine: Vec<&OsStr> = segments(path).collect();
        let Some(last) = spine.pop() else {
            return Some(mem::take(&mut self.root));
        };

        // Descend to the parent of the node to detach
        let mut node = &mut self.root;
        for segment in spine {
            node = node.children.get_mut(segment)?;
        }
        node.children.remove(last)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<H> Default for Tree<H> {
    /// Creates an empty watch tree.
    fn default() -> Self {
        Self { root: Node::default(), len: 0 }
    }
}

impl<H> Default for Node<H> {
    /// Creates an empty watch tree node.
    fn default() -> Self {
        Self { children: BTreeMap::new(), handle: None }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns an iterator over the normal segments of a path.
fn segments(path: &Path) -> impl Iterator<Item = &OsStr> {
    path.components().filter_map(|component| match component {
        Component::Normal(segment) => Some(segment),
        _ => None,
    })
}

// ----------------------------------------------------------------------------

/// Collects all handles of a node in post-order.
fn collect<H>(node: Node<H>, handles: &mut Vec<H>) {
    for (_, child) in node.children {
        collect(child, handles);
    }
    if let Some(handle) = node.handle {
        handles.push(handle);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_counts_handles() {
        let mut tree = Tree::new();
        tree.insert(Path::new(""), 0);
        tree.insert(Path::new("a"), 1);
        tree.insert(Path::new("a/b"), 2);

        assert_eq!(tree.len(), 3);
        assert!(tree.contains(Path::new("a/b")));
    }

    #[test]
    fn test_insert_replaces_handle() {
        let mut tree = Tree::new();
        assert_eq!(tree.insert(Path::new("a"), 1), None);
        assert_eq!(tree.insert(Path::new("a"), 2), Some(1));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_spine_nodes_hold_no_handle() {
        let mut tree = Tree::new();
        tree.insert(Path::new("a/b/c"), 1);

        assert_eq!(tree.len(), 1);
        assert!(!tree.contains(Path::new("a")));
        assert!(!tree.contains(Path::new("a/b")));
        assert!(tree.contains(Path::new("a/b/c")));
    }

    #[test]
    fn test_remove_is_post_order() {
        let mut tree = Tree::new();
        tree.insert(Path::new("a"), 1);
        tree.insert(Path::new("a/b"), 2);
        tree.insert(Path::new("a/b/c"), 3);
        tree.insert(Path::new("a/d"), 4);

        // Descendants come first, the subtree root last
        let handles = tree.remove(Path::new("a"));
        assert_eq!(handles, vec![3, 2, 4, 1]);
        assert_eq!(tree.len(), 0);
        assert!(!tree.contains(Path::new("a")));
    }

    #[test]
    fn test_remove_subtree_keeps_siblings() {
        let mut tree = Tree::new();
        tree.insert(Path::new("a"), 1);
        tree.insert(Path::new("a/b"), 2);
        tree.insert(Path::new("c"), 3);

        assert_eq!(tree.remove(Path::new("a")), vec![2, 1]);
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(Path::new("c")));
    }

    #[test]
    fn test_remove_everything() {
        let mut tree = Tree::new();
        tree.insert(Path::new(""), 0);
        tree.insert(Path::new("a"), 1);

        assert_eq!(tree.remove(Path::new("")), vec![1, 0]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_remove_missing_path() {
        let mut tree: Tree<u32> = Tree::new();
        tree.insert(Path::new("a"), 1);

        assert!(tree.remove(Path::new("b/c")).is_empty());
        assert_eq!(tree.len(), 1);
    }
}
