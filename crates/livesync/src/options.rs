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

//! Command line options.

use clap::Parser;
use livesync_watch::{Filter, Preset};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use super::error::{Error, Result};
use super::transfer::Destination;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Command line options.
///
/// Parsing is clap's business; everything clap cannot express - path
/// normalization, the stricter rules of daemon mode, flag interactions - is
/// applied by [`Options::validate`], which must run before the options are
/// used.
#[derive(Debug, Parser)]
#[command(
    name = "livesync",
    about = "Continuously mirror a directory tree to one or more destinations"
)]
pub struct Options {
    /// Source directory to mirror
    #[arg(long, value_name = "PATH")]
    pub from: PathBuf,

    /// Destination, local path or host:path; repeatable
    #[arg(long = "to", value_name = "DEST")]
    pub to: Vec<Destination>,

    /// Enable verbose internal tracing
    #[arg(long)]
    pub debug: bool,

    /// Detach from the controlling terminal
    #[arg(long)]
    pub daemon: bool,

    /// Route log output to syslog
    #[arg(long)]
    pub syslog: bool,

    /// Write a PID file after detaching
    #[arg(long, value_name = "PATH")]
    pub pidfile: Option<PathBuf>,

    /// Print the would-be transfer commands without executing them
    #[arg(long)]
    pub dry: bool,

    /// Propagate deletions to the destinations
    #[arg(long)]
    pub delete: bool,

    /// Suppress informational output
    #[arg(long)]
    pub quiet: bool,

    /// Additional ignore pattern; repeatable
    #[arg(long = "ignore", value_name = "REGEX")]
    pub ignore: Vec<String>,

    /// Ignore temporary files, swap files and autosave names
    #[arg(long)]
    pub ignore_temp: bool,

    /// Ignore path segments beginning with a dot
    #[arg(long)]
    pub ignore_dotfiles: bool,

    /// Ignore backup files
    #[arg(long)]
    pub ignore_backups: bool,

    /// Ignore log files and log directories
    #[arg(long)]
    pub ignore_logs: bool,

    /// Pattern forwarded to the transfer tool as --exclude; repeatable
    #[arg(long = "rsync-exclude", value_name = "PATTERN")]
    pub rsync_exclude: Vec<String>,

    /// Quiescence interval in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 1.0)]
    pub interval: f64,

    /// Changed sibling count above which a directory is synced recursively
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub full_sync_threshold: usize,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Options {
    /// Validates and normalizes the options.
    ///
    /// Trailing separators are stripped from the source path, and under
    /// `--daemon` the source is canonicalized, as the working directory
    /// changes once the process detaches. Syslog is implied by daemon mode,
    /// and `--debug` wins over `--quiet`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for anything the operator got wrong: a
    /// source that is not a directory, relative paths in daemon mode, a PID
    /// file without daemon mode, or nonsensical numeric values.
    pub fn validate(mut self) -> Result<Self> {
        if self.debug {
            self.quiet = false;
        }
        if self.daemon {
            self.syslog = true;
        }

        // Strip trailing separators
        self.from = self.from.components().collect();

        if !self.interval.is_finite() || self.interval < 0.0 {
            return Err(Error::Config(String::from(
                "interval must be a non-negative number of seconds",
            )));
        }
        if self.full_sync_threshold == 0 {
            return Err(Error::Config(String::from(
                "full sync threshold must be at least 1",
            )));
        }

        if self.pidfile.is_some() && !self.daemon {
            return Err(Error::Config(String::from(
                "a PID file requires daemon mode",
            )));
        }
        if let Some(pidfile) = &self.pidfile {
            if !pidfile.is_absolute() {
                return Err(Error::Config(String::from(
                    "the PID file path must be absolute",
                )));
            }
        }

        if self.daemon {
            // The daemon changes its working directory, so every path it
            // keeps using must survive that
            if !self.from.is_absolute() {
                return Err(Error::Config(String::from(
                    "the source path must be absolute in daemon mode",
                )));
            }
            for destination in &self.to {
                if let Destination::Local(path) = destination {
                    if !path.is_absolute() {
                        return Err(Error::Config(format!(
                            "destination {} must be absolute in daemon mode",
                            path.display()
                        )));
                    }
                }
            }
            self.from = fs::canonicalize(&self.from).map_err(|err| {
                Error::Config(format!(
                    "cannot canonicalize {}: {err}",
                    self.from.display()
                ))
            })?;
        }

        if !self.from.is_dir() {
            return Err(Error::Config(format!(
                "{} is not a directory",
                self.from.display()
            )));
        }
        Ok(self)
    }

    /// Builds the ignore filter from patterns and preset bundles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a user-supplied pattern does not
    /// compile.
    pub fn filter(&self) -> Result<Filter> {
        let mut filter = Filter::new();
        for pattern in &self.ignore {
            filter.rule(pattern).map_err(|err| {
                Error::Config(format!("invalid ignore pattern: {err}"))
            })?;
        }

        let presets = [
            (self.ignore_temp, Preset::Temp),
            (self.ignore_dotfiles, Preset::Dotfiles),
            (self.ignore_backups, Preset::Backups),
            (self.ignore_logs, Preset::Logs),
        ];
        for (enabled, preset) in presets {
            if enabled {
                filter.preset(preset)?;
            }
        }
        Ok(filter)
    }

    /// Returns the quiescence interval as a duration.
    #[must_use]
    pub fn quiescence(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns options with only the source path set.
    fn options(from: &str) -> Options {
        Options::parse_from(["livesync", "--from", from])
    }

    #[test]
    fn test_source_must_be_directory() {
        let options = options("/definitely/not/there");
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_trailing_separator_is_stripped() {
        let options = options("/tmp/").validate().unwrap();
        assert_eq!(options.from, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_debug_wins_over_quiet() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--debug", "--quiet",
        ]);
        let options = options.validate().unwrap();
        assert!(options.debug);
        assert!(!options.quiet);
    }

    #[test]
    fn test_daemon_implies_syslog() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--daemon",
        ]);
        let options = options.validate().unwrap();
        assert!(options.syslog);
    }

    #[test]
    fn test_pidfile_requires_daemon() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--pidfile", "/run/livesync.pid",
        ]);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_daemon_rejects_relative_source() {
        let options = Options::parse_from([
            "livesync", "--from", ".", "--daemon",
        ]);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_daemon_rejects_relative_destination() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--daemon", "--to", "backup",
        ]);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_daemon_accepts_remote_destination() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--daemon", "--to", "host:backup",
        ]);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_interval_must_be_non_negative() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--interval=-1",
        ]);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_threshold_must_be_positive() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--full-sync-threshold", "0",
        ]);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let options = Options::parse_from([
            "livesync", "--from", "/tmp", "--ignore", "(unclosed",
        ]);
        let options = options.validate().unwrap();
        assert!(matches!(options.filter(), Err(Error::Config(_))));
    }
}
