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

//! Sync executor.

use livesync_watch::Action;
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::{fmt, fs};
use tracing::{debug, info, warn};

use super::options::Options;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// External transfer tool.
const RSYNC: &str = "rsync";

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Sync destination.
///
/// Anything containing a colon is a remote `host:path` target and handled as
/// an opaque string; everything else is a local directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    /// Local directory.
    Local(PathBuf),
    /// Remote `host:path` target.
    Remote(String),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Sync executor.
///
/// The executor maps each surviving action onto one transfer tool invocation
/// per destination. Attributes, ownership, devices and symbolic links are
/// always preserved; recursion and deletion are controlled per action, never
/// implicitly. Transfer failures are logged and do not terminate the agent -
/// a destination that is temporarily unreachable will be brought back in
/// sync by a later batch touching the same paths, or by the next full sync.
#[derive(Debug)]
pub struct Transfer {
    /// Source root all action paths live under.
    source: PathBuf,
    /// Sync destinations.
    destinations: Vec<Destination>,
    /// Patterns forwarded as `--exclude`.
    excludes: Vec<String>,
    /// Whether deletion propagation is enabled.
    delete: bool,
    /// Whether to make the transfer tool verbose.
    verbose: bool,
    /// Whether to print commands instead of executing them.
    dry: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Destination {
    /// Maps a source-relative suffix onto the destination prefix.
    fn join(&self, suffix: &Path) -> OsString {
        match self {
            Destination::Local(base) => {
                if suffix.as_os_str().is_empty() {
                    base.clone().into_os_string()
                } else {
                    base.join(suffix).into_os_string()
                }
            }
            Destination::Remote(spec) => {
                if suffix.as_os_str().is_empty() {
                    spec.clone().into()
                } else {
                    format!("{spec}/{}", suffix.to_string_lossy()).into()
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------

impl Transfer {
    /// Creates a sync executor from the validated options.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            source: options.from.clone(),
            destinations: options.to.clone(),
            excludes: options.rsync_exclude.clone(),
            delete: options.delete,
            verbose: options.debug,
            dry: options.dry,
        }
    }

    /// Executes the given actions against every destination.
    ///
    /// Actions are winnowed first: sorted ascending by path, actions covered
    /// by a preceding recursive action are dropped, and actions whose path
    /// has vanished since the events were recorded are dropped as well.
    /// Without destinations nothing is spawned and the surviving actions are
    /// merely logged.
    pub fn execute(&self, actions: &[Action]) {
        let actions =
            survivors(actions, |path| fs::symlink_metadata(path).is_ok());

        if self.destinations.is_empty() {
            for action in &actions {
                info!(
                    "would sync {}{}",
                    action.path.display(),
                    if action.recurse { ", recursively" } else { "" }
                );
            }
            return;
        }

        for action in &actions {
            for destination in &self.destinations {
                let Some(arguments) = self.arguments(action, destination)
                else {
                    continue;
                };

                if self.dry {
                    println!("{RSYNC} {}", render(&arguments));
                    continue;
                }

                debug!("spawning {RSYNC} {}", render(&arguments));
                match Command::new(RSYNC).args(&arguments).status() {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        warn!("{RSYNC} exited with {status}");
                    }
                    Err(err) => {
                        warn!("cannot spawn {RSYNC}: {err}");
                    }
                }
            }
        }
    }

    /// Builds the transfer tool arguments for one action and destination.
    ///
    /// A recursive action passes `-r` and trailing separators on both sides,
    /// so the tool syncs directory contents onto directory contents. A leaf
    /// action passes the bare source path and the destination's *parent*
    /// directory, transferring the single object without descending.
    fn arguments(
        &self, action: &Action, destination: &Destination,
    ) -> Option<Vec<OsString>> {
        let suffix = action.path.strip_prefix(&self.source).ok()?;

        let mut arguments: Vec<OsString> = vec!["-lptgoD".into()];
        if self.verbose {
            arguments.push("-v".into());
        }
        for pattern in &self.excludes {
            arguments.push("--exclude".into());
            arguments.push(pattern.into());
        }
        if action.delete && self.delete {
            arguments.push("--delete".into());
        }

        if action.recurse {
            arguments.push("-r".into());
            arguments.push("--".into());

            let mut from = action.path.clone().into_os_string();
            from.push("/");
            arguments.push(from);

            let mut to = destination.join(suffix);
            to.push("/");
            arguments.push(to);
        } else {
            arguments.push("--".into());
            arguments.push(action.path.clone().into_os_string());

            let parent = suffix.parent().unwrap_or(Path::new(""));
            arguments.push(destination.join(parent));
        }
        Some(arguments)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for Destination {
    type Err = Infallible;

    /// Parses a destination from a string.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = if value.len() > 1 {
            value.trim_end_matches('/')
        } else {
            value
        };
        Ok(if value.contains(':') {
            Destination::Remote(value.to_string())
        } else {
            Destination::Local(PathBuf::from(value))
        })
    }
}

impl fmt::Display for Destination {
    /// Formats the destination for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Destination::Local(path) => path.display().fmt(f),
            Destination::Remote(spec) => spec.fmt(f),
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Applies overlap elimination and the on-disk liveness check.
///
/// Sorting ascending by path makes every ancestor precede its descendants,
/// so a single pass with a set of claimed prefixes suffices: a recursive
/// action claims its path, and any later action at or below a claimed prefix
/// is already covered. Actions for paths that no longer exist are dropped,
/// as the events of a batch may describe objects that are gone by now.
fn survivors<F>(actions: &[Action], exists: F) -> Vec<Action>
where
    F: Fn(&Path) -> bool,
{
    let mut sorted = actions.to_vec();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut prefixes: Vec<PathBuf> = Vec::new();
    let mut survivors = Vec::new();
    for action in sorted {
        if prefixes.iter().any(|prefix| action.path.starts_with(prefix)) {
            continue;
        }
        if !exists(&action.path) {
            debug!("skipping vanished {}", action.path.display());
            continue;
        }
        if action.recurse {
            prefixes.push(action.path.clone());
        }
        survivors.push(action);
    }
    survivors
}

// ----------------------------------------------------------------------------

/// Renders an argument vector for display.
fn render(arguments: &[OsString]) -> String {
    let arguments: Vec<_> = arguments
        .iter()
        .map(|argument| argument.to_string_lossy())
        .collect();
    arguments.join(" ")
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns an executor for `/s` with the given destinations.
    fn transfer(destinations: Vec<Destination>) -> Transfer {
        Transfer {
            source: PathBuf::from("/s"),
            destinations,
            excludes: Vec::new(),
            delete: false,
            verbose: false,
            dry: false,
        }
    }

    fn local(path: &str) -> Destination {
        Destination::Local(PathBuf::from(path))
    }

    #[test]
    fn test_parse_destination() {
        assert_eq!(
            "backup/".parse::<Destination>().unwrap(),
            Destination::Local(PathBuf::from("backup"))
        );
        assert_eq!(
            "mirror:/srv/backup".parse::<Destination>().unwrap(),
            Destination::Remote(String::from("mirror:/srv/backup"))
        );
    }

    #[test]
    fn test_leaf_arguments() {
        let transfer = transfer(vec![local("/d")]);
        let action = Action::leaf(PathBuf::from("/s/a.txt"));

        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(arguments, ["-lptgoD", "--", "/s/a.txt", "/d"]);
    }

    #[test]
    fn test_leaf_arguments_map_to_parent() {
        let transfer = transfer(vec![local("/d")]);
        let action = Action::leaf(PathBuf::from("/s/sub/a.txt"));

        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(arguments, ["-lptgoD", "--", "/s/sub/a.txt", "/d/sub"]);
    }

    #[test]
    fn test_recursive_arguments() {
        let transfer = transfer(vec![local("/d")]);
        let action = Action::subtree(PathBuf::from("/s/new"), false);

        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(arguments, ["-lptgoD", "-r", "--", "/s/new/", "/d/new/"]);
    }

    #[test]
    fn test_delete_requires_global_flag() {
        let action = Action::subtree(PathBuf::from("/s"), true);

        // Without the global flag, the per-action flag is inert
        let transfer = transfer(vec![local("/d")]);
        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(arguments, ["-lptgoD", "-r", "--", "/s/", "/d/"]);

        let transfer = Transfer { delete: true, ..transfer };
        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(
            arguments,
            ["-lptgoD", "--delete", "-r", "--", "/s/", "/d/"]
        );
    }

    #[test]
    fn test_excludes_and_verbosity() {
        let transfer = Transfer {
            excludes: vec![String::from("*.o")],
            verbose: true,
            ..transfer(vec![local("/d")])
        };
        let action = Action::leaf(PathBuf::from("/s/a"));

        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(
            arguments,
            ["-lptgoD", "-v", "--exclude", "*.o", "--", "/s/a", "/d"]
        );
    }

    #[test]
    fn test_remote_destination_mapping() {
        let transfer = transfer(vec![]);
        let remote = Destination::Remote(String::from("host:/d2"));

        let leaf = Action::leaf(PathBuf::from("/s/sub/a"));
        let arguments = transfer.arguments(&leaf, &remote).unwrap();
        assert_eq!(arguments, ["-lptgoD", "--", "/s/sub/a", "host:/d2/sub"]);

        let subtree = Action::subtree(PathBuf::from("/s/sub"), false);
        let arguments = transfer.arguments(&subtree, &remote).unwrap();
        assert_eq!(
            arguments,
            ["-lptgoD", "-r", "--", "/s/sub/", "host:/d2/sub/"]
        );
    }

    #[test]
    fn test_full_sync_arguments() {
        let transfer = Transfer { delete: true, ..transfer(vec![]) };
        let action = Action::subtree(PathBuf::from("/s"), true);

        let arguments = transfer.arguments(&action, &local("/d")).unwrap();
        assert_eq!(
            arguments,
            ["-lptgoD", "--delete", "-r", "--", "/s/", "/d/"]
        );
    }

    #[test]
    fn test_survivors_drop_covered_actions() {
        let actions = vec![
            Action::leaf(PathBuf::from("/s/a/file")),
            Action::subtree(PathBuf::from("/s/a"), false),
            Action::leaf(PathBuf::from("/s/b")),
        ];

        let survivors = survivors(&actions, |_| true);
        assert_eq!(survivors, vec![
            Action::subtree(PathBuf::from("/s/a"), false),
            Action::leaf(PathBuf::from("/s/b")),
        ]);
    }

    #[test]
    fn test_survivors_deduplicate_equal_recursive_actions() {
        let actions = vec![
            Action::subtree(PathBuf::from("/s/a"), true),
            Action::subtree(PathBuf::from("/s/a"), true),
        ];

        let survivors = survivors(&actions, |_| true);
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_survivors_keep_leaf_siblings() {
        let actions = vec![
            Action::leaf(PathBuf::from("/s/a")),
            Action::leaf(PathBuf::from("/s/b")),
        ];

        // Leaf actions claim no prefix
        let survivors = survivors(&actions, |_| true);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn test_survivors_drop_vanished_paths() {
        let actions = vec![
            Action::leaf(PathBuf::from("/s/gone")),
            Action::leaf(PathBuf::from("/s/here")),
        ];

        let survivors =
            survivors(&actions, |path| path == Path::new("/s/here"));
        assert_eq!(survivors, vec![Action::leaf(PathBuf::from("/s/here"))]);
    }

    #[test]
    fn test_no_prefix_match_on_sibling_names() {
        let actions = vec![
            Action::subtree(PathBuf::from("/s/ab"), false),
            Action::leaf(PathBuf::from("/s/abc")),
        ];

        // Prefix containment is per path segment, not per character
        let survivors = survivors(&actions, |_| true);
        assert_eq!(survivors.len(), 2);
    }
}
