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

//! Agent error.

use std::{io, result};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Agent error.
///
/// Startup decides between two exit codes: configuration problems are the
/// operator's to fix and exit with `2`, everything else is a fatal internal
/// error and exits with `255`. Runtime problems - a failing transfer, an
/// unwatchable directory - never surface here; they are logged and the main
/// loop continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error("{0}")]
    Config(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Watch agent error.
    #[error(transparent)]
    Watch(#[from] livesync_watch::Error),

    /// Process primitive error.
    #[error(transparent)]
    Unix(#[from] nix::Error),

    /// Syslog connection error.
    #[error("cannot connect to syslog: {0}")]
    Syslog(String),

    /// Logger already installed.
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Error {
    /// Returns the process exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            _ => 255,
        }
    }
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Agent result.
pub type Result<T = ()> = result::Result<T, Error>;
