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

//! Ignore filter.

use regex::Regex;
use std::path::Path;

use super::Result;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Preset rule bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// Temporary files, editor swap files and autosave names.
    Temp,
    /// Path segments beginning with a dot.
    Dotfiles,
    /// Backup files.
    Backups,
    /// Log files and log directories.
    Logs,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Ignore filter.
///
/// The filter holds an ordered list of regular expressions and reports a path
/// as ignored if any of them matches. It is applied uniformly - a path that
/// is not watched is also never synced, and vice versa - so watching and
/// event processing can't drift apart.
///
/// Rules match against the path relative to the source root. A rule starting
/// with `^` is anchored at a path segment boundary rather than at the start
/// of the string, so `^foo` matches `foo` as well as `bar/foo`. All other
/// rules are unanchored.
///
/// # Examples
///
/// ```
/// use livesync_watch::{Filter, Preset};
///
/// // Create ignore filter with a preset bundle
/// let mut filter = Filter::new();
/// filter.preset(Preset::Temp).unwrap();
///
/// assert!(filter.is_ignored("build/cache.tmp"));
/// assert!(!filter.is_ignored("src/main.c"));
/// ```
#[derive(Debug, Default)]
pub struct Filter {
    /// Compiled rules.
    rules: Vec<Regex>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Preset {
    /// Returns the rules of the preset bundle.
    fn rules(self) -> &'static [&'static str] {
        match self {
            Preset::Temp => &[
                r"\.te?mp$",
                r"^\.[^/]*\bte?mp\b",
                r"^[._][^/]*\.swp$",
                r"^#[^/]+#$",
            ],
            Preset::Dotfiles => &[r"^\."],
            Preset::Backups => &[r"\.(bak|backup|old|orig)$", r"~$"],
            Preset::Logs => &[r"[._-]log$", r"^logs?(/|$)"],
        }
    }
}

// ----------------------------------------------------------------------------

impl Filter {
    /// Creates an ignore filter.
    ///
    /// The filter starts out empty, ignoring nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an ignore rule.
    ///
    /// A leading `^` is rewritten to match either the start of the path or
    /// the position immediately after a separator, which anchors the rule at
    /// a path segment boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`][] if the pattern is not a valid regular
    /// expression.
    ///
    /// [`Error::Pattern`]: super::Error::Pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use livesync_watch::Filter;
    ///
    /// // Create ignore filter with a segment-anchored rule
    /// let mut filter = Filter::new();
    /// filter.rule(r"^target$").unwrap();
    ///
    /// assert!(filter.is_ignored("target"));
    /// assert!(filter.is_ignored("vendor/target"));
    /// assert!(!filter.is_ignored("retarget"));
    /// ```
    pub fn rule(&mut self, pattern: &str) -> Result {
        let pattern = match pattern.strip_prefix('^') {
            Some(rest) => format!("(?:^|/){rest}"),
            None => pattern.to_string(),
        };

        // Add compiled rule
        self.rules.push(Regex::new(&pattern)?);
        Ok(())
    }

    /// Adds a preset rule bundle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`][] if a bundled pattern fails to compile,
    /// which would be a bug in this crate.
    ///
    /// [`Error::Pattern`]: super::Error::Pattern
    pub fn preset(&mut self, preset: Preset) -> Result {
        for pattern in preset.rules() {
            self.rule(pattern)?;
        }
        Ok(())
    }

    /// Checks whether the given path is ignored.
    ///
    /// The path is expected to be relative to the source root, so rules can
    /// never match components above it.
    #[must_use]
    pub fn is_ignored<P>(&self, path: P) -> bool
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_string_lossy();
        self.rules.iter().any(|rule| rule.is_match(&path))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
