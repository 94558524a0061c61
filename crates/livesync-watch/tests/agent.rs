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

//! Watch agent integration tests.
//!
//! These tests drive a real inotify instance against throwaway directories.
//! The quiescence interval is kept short, and every file system mutation is
//! followed by a settling sleep well above it, so batches close reliably.

use livesync_watch::agent::plan;
use livesync_watch::{Action, Agent, Batch, Filter, Preset};
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates an agent with established watches on the given root.
fn agent(root: &Path, filter: Filter, delete: bool) -> Agent {
    let mut agent = Agent::new(
        root.to_path_buf(),
        filter,
        Duration::from_millis(25),
        delete,
    )
    .expect("inotify instance");
    agent.scan().expect("initial scan");
    agent
}

/// Gives the kernel time to queue the events of a preceding mutation.
fn settle() {
    thread::sleep(Duration::from_millis(100));
}

/// Collects the next batch of changes, which must not be an overflow.
fn changes(agent: &mut Agent) -> livesync_watch::Changes {
    let stop = AtomicBool::new(false);
    match agent.next_batch(&stop).expect("next batch") {
        Batch::Changes(changes) => changes,
        batch => panic!("expected changes, got {batch:?}"),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[test]
fn test_scan_watches_every_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::create_dir(dir.path().join("c")).unwrap();

    let agent = agent(dir.path(), Filter::new(), false);
    assert_eq!(agent.watches(), 4);
}

#[test]
fn test_scan_skips_ignored_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();

    let mut filter = Filter::new();
    filter.preset(Preset::Dotfiles).unwrap();

    // Only the root and `src` may be watched
    let agent = agent(dir.path(), filter, false);
    assert_eq!(agent.watches(), 2);
}

#[test]
fn test_leaf_touch_produces_single_action() {
    let dir = TempDir::new().unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);

    fs::write(dir.path().join("a.txt"), b"payload").unwrap();
    settle();

    let changes = changes(&mut agent);
    let actions = plan::actions(&changes, dir.path(), 10);
    assert_eq!(actions, vec![Action::leaf(dir.path().join("a.txt"))]);
}

#[test]
fn test_new_directory_folds_into_one_recursive_action() {
    let dir = TempDir::new().unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);

    // Create a directory and populate it within one batch
    let new = dir.path().join("new");
    fs::create_dir(&new).unwrap();
    fs::write(new.join("x"), b"x").unwrap();
    fs::write(new.join("y"), b"y").unwrap();
    settle();

    let changes = changes(&mut agent);
    let actions = plan::actions(&changes, dir.path(), 10);
    assert_eq!(actions, vec![Action::subtree(new, false)]);

    // The new directory must have been picked up by the watch set
    assert_eq!(agent.watches(), 2);
}

#[test]
fn test_nested_directories_are_watched() {
    let dir = TempDir::new().unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);

    fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    settle();

    let _ = changes(&mut agent);
    assert_eq!(agent.watches(), 4);
}

#[test]
fn test_deletion_without_propagation_plans_nothing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("old.txt"), b"old").unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);

    fs::remove_file(dir.path().join("old.txt")).unwrap();
    settle();

    let changes = changes(&mut agent);
    assert!(plan::actions(&changes, dir.path(), 10).is_empty());
}

#[test]
fn test_deletion_with_propagation_syncs_parent() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("old.txt"), b"old").unwrap();
    let mut agent = agent(dir.path(), Filter::new(), true);

    fs::remove_file(dir.path().join("old.txt")).unwrap();
    settle();

    let changes = changes(&mut agent);
    let actions = plan::actions(&changes, dir.path(), 10);
    assert_eq!(actions, vec![Action::subtree(dir.path().to_path_buf(), true)]);
}

#[test]
fn test_removed_directory_is_unwatched() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("gone")).unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);
    assert_eq!(agent.watches(), 2);

    fs::remove_dir(dir.path().join("gone")).unwrap();
    settle();

    let _ = changes(&mut agent);
    assert_eq!(agent.watches(), 1);
}

#[test]
fn test_moved_away_directory_is_unwatched() {
    let dir = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("away/deep")).unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);
    assert_eq!(agent.watches(), 3);

    fs::rename(dir.path().join("away"), elsewhere.path().join("away"))
        .unwrap();
    settle();

    let _ = changes(&mut agent);
    assert_eq!(agent.watches(), 1);
}

#[test]
fn test_ignored_files_produce_no_changes() {
    let dir = TempDir::new().unwrap();
    let mut filter = Filter::new();
    filter.preset(Preset::Temp).unwrap();
    let mut agent = agent(dir.path(), filter, false);

    fs::write(dir.path().join("scratch.tmp"), b"scratch").unwrap();
    settle();

    let changes = changes(&mut agent);
    assert!(changes.is_empty());
}

#[test]
fn test_interrupt_while_idle() {
    let dir = TempDir::new().unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);

    let stop = AtomicBool::new(true);
    assert!(matches!(
        agent.next_batch(&stop).unwrap(),
        Batch::Interrupted
    ));
}

#[test]
fn test_rescan_rebuilds_watches() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("a")).unwrap();
    let mut agent = agent(dir.path(), Filter::new(), false);
    assert_eq!(agent.watches(), 2);

    agent.rescan().unwrap();
    assert_eq!(agent.watches(), 2);
}
