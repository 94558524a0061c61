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

//! Diagnostics routing.

use std::io;
use std::process;
use syslog::{BasicLogger, Facility, Formatter3164};
use tracing::Level;

use super::error::{Error, Result};
use super::options::Options;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Initializes diagnostics emission.
///
/// Console mode installs a `tracing` subscriber writing to stderr. Syslog
/// mode instead binds the `log` facade to the system logger; `tracing`
/// events reach it through the crate's `log` compatibility feature, which
/// kicks in exactly when no subscriber is installed. Informational output is
/// reduced to warnings under `--quiet` and expanded to debug under
/// `--debug`.
///
/// # Errors
///
/// Returns an error if the syslog socket cannot be opened or a logger is
/// already installed.
pub fn init(options: &Options) -> Result {
    let level = if options.debug {
        Level::DEBUG
    } else if options.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    if options.syslog {
        let formatter = Formatter3164 {
            facility: Facility::LOG_DAEMON,
            hostname: None,
            process: String::from("livesync"),
            pid: process::id(),
        };
        let logger = syslog::unix(formatter)
            .map_err(|err| Error::Syslog(err.to_string()))?;
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))?;
        log::set_max_level(filter(level));
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

// ----------------------------------------------------------------------------

/// Converts a tracing level to a log level filter.
fn filter(level: Level) -> log::LevelFilter {
    if level == Level::ERROR {
        log::LevelFilter::Error
    } else if level == Level::WARN {
        log::LevelFilter::Warn
    } else if level == Level::INFO {
        log::LevelFilter::Info
    } else if level == Level::DEBUG {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Trace
    }
}
