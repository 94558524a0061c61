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

//! Sync planner.

use std::path::{Path, PathBuf};

use super::changes::{Changes, Mark, Node};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Sync action.
///
/// An action names one path under the source root to bring in sync. A
/// recursive action spans the entire subtree; a leaf action transfers just
/// the one object, attributes and content, without descending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    /// Path under the source root.
    pub path: PathBuf,
    /// Whether to recurse into the subtree.
    pub recurse: bool,
    /// Whether to remove entries missing on the source side.
    pub delete: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Action {
    /// Creates a non-recursive action on a single object.
    #[must_use]
    pub fn leaf(path: PathBuf) -> Self {
        Self { path, recurse: false, delete: false }
    }

    /// Creates a recursive action on a subtree.
    #[must_use]
    pub fn subtree(path: PathBuf, delete: bool) -> Self {
        Self { path, recurse: true, delete }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Computes the sync actions for a change tree.
///
/// The walk emits, for a node at path `P`:
///
/// - a leaf action on `P` if the node is an unmarked leaf;
/// - a recursive action with deletion on the *parent* of `P` if the node is
///   marked deleted - the object no longer exists, so only syncing its
///   parent with deletion enabled propagates the removal;
/// - a recursive action on `P` if the node is a created directory, since
///   entries may have appeared inside it before its watch was in place;
/// - a recursive action on `P` if the node has at least `threshold`
///   children, the point at which descending further stops being worth it;
/// - otherwise nothing, descending into each child instead.
///
/// The result is sorted ascending by path, so ancestors precede descendants
/// and overlap elimination at execution time can work in a single pass. The
/// list may still contain overlapping or duplicate entries - eliminating
/// them is the executor's job, as it folds in a liveness check against the
/// file system.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use livesync_watch::{agent::plan, Action, Changes, Mark};
///
/// // Record a batch of changes
/// let mut changes = Changes::new();
/// changes.mark(Path::new("build"), Mark::CreatedDir);
///
/// // Plan sync actions
/// let actions = plan::actions(&changes, Path::new("/src"), 10);
/// assert_eq!(actions, vec![
///     Action::subtree("/src/build".into(), false),
/// ]);
/// ```
#[must_use]
pub fn actions(changes: &Changes, root: &Path, threshold: usize) -> Vec<Action> {
    let mut actions = Vec::new();
    if !changes.is_empty() {
        walk(&changes.root, root.to_path_buf(), threshold, &mut actions);
    }

    // Sort ascending by path, so ancestors precede descendants
    actions.sort_by(|a, b| a.path.cmp(&b.path));
    actions
}

// ----------------------------------------------------------------------------

/// Walks a change tree node, emitting actions.
fn walk(node: &Node, path: PathBuf, threshold: usize, actions: &mut Vec<Action>) {
    match node.mark {
        // The object is gone; deletion propagates through a recursive sync
        // of the parent with deletion enabled
        Some(Mark::Deleted) => {
            let parent = path.parent().unwrap_or(path.as_path()).to_path_buf();
            actions.push(Action::subtree(parent, true));
        }

        // The directory is new; entries may have raced its watch, so the
        // whole subtree is synced regardless of recorded children
        Some(Mark::CreatedDir) => {
            actions.push(Action::subtree(path, false));
        }

        None if node.children.is_empty() => {
            actions.push(Action::leaf(path));
        }

        // Too many changed children to be worth descending
        None if node.children.len() >= threshold => {
            actions.push(Action::subtree(path, false));
        }

        None => {
            for (segment, child) in &node.children {
                walk(child, path.join(segment), threshold, actions);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/src")
    }

    #[test]
    fn test_empty_changes_plan_nothing() {
        let changes = Changes::new();
        assert!(actions(&changes, &root(), 10).is_empty());
    }

    #[test]
    fn test_leaf_touch() {
        let mut changes = Changes::new();
        changes.touch(Path::new("a/file.txt"));

        assert_eq!(actions(&changes, &root(), 10), vec![
            Action::leaf("/src/a/file.txt".into()),
        ]);
    }

    #[test]
    fn test_created_directory_folds_descendants() {
        let mut changes = Changes::new();
        changes.mark(Path::new("new"), Mark::CreatedDir);
        changes.touch(Path::new("new/x"));
        changes.touch(Path::new("new/y"));

        assert_eq!(actions(&changes, &root(), 10), vec![
            Action::subtree("/src/new".into(), false),
        ]);
    }

    #[test]
    fn test_deletion_syncs_parent() {
        let mut changes = Changes::new();
        changes.mark(Path::new("a/old"), Mark::Deleted);

        assert_eq!(actions(&changes, &root(), 10), vec![
            Action::subtree("/src/a".into(), true),
        ]);
    }

    #[test]
    fn test_sibling_deletions_collapse_after_sort() {
        let mut changes = Changes::new();
        changes.mark(Path::new("a/one"), Mark::Deleted);
        changes.mark(Path::new("a/two"), Mark::Deleted);

        // Both deletions point at the same parent; deduplication is left to
        // the executor's overlap elimination
        assert_eq!(actions(&changes, &root(), 10), vec![
            Action::subtree("/src/a".into(), true),
            Action::subtree("/src/a".into(), true),
        ]);
    }

    #[test]
    fn test_below_threshold_emits_leaves() {
        let mut changes = Changes::new();
        for i in 0..9 {
            changes.touch(&Path::new("bulk").join(format!("{i}.dat")));
        }

        let actions = actions(&changes, &root(), 10);
        assert_eq!(actions.len(), 9);
        assert!(actions.iter().all(|action| !action.recurse));
    }

    #[test]
    fn test_at_threshold_folds_into_parent() {
        let mut changes = Changes::new();
        for i in 0..10 {
            changes.touch(&Path::new("bulk").join(format!("{i}.dat")));
        }

        assert_eq!(actions(&changes, &root(), 10), vec![
            Action::subtree("/src/bulk".into(), false),
        ]);
    }

    #[test]
    fn test_output_is_sorted() {
        let mut changes = Changes::new();
        changes.touch(Path::new("z"));
        changes.touch(Path::new("a/deep/file"));
        changes.touch(Path::new("m"));

        let actions = actions(&changes, &root(), 10);
        let paths: Vec<_> = actions.iter().map(|action| &action.path).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_created_then_deleted_keeps_deletion() {
        let mut changes = Changes::new();
        changes.mark(Path::new("a/dir"), Mark::CreatedDir);
        changes.mark(Path::new("a/dir"), Mark::Deleted);

        assert_eq!(actions(&changes, &root(), 10), vec![
            Action::subtree("/src/a".into(), true),
        ]);
    }
}
