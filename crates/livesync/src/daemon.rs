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

//! Daemon plumbing.

use nix::unistd::{
    chdir, dup2_stderr, dup2_stdin, dup2_stdout, fork, setsid, ForkResult,
};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;

use super::error::Result;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Detaches the process from the controlling terminal.
///
/// The classic double fork: the first fork hands control back to the shell,
/// `setsid` gives up the controlling terminal along with session leadership,
/// and the second fork ensures the process can never reacquire one. The
/// working directory moves to `/` so the daemon doesn't pin a mount, and the
/// standard streams are pointed at `/dev/null`.
///
/// # Errors
///
/// Errors from the underlying process primitives are forwarded.
pub fn detach() -> Result {
    // The process is still single-threaded at this point, which is what
    // makes forking sound
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => process::exit(0),
        ForkResult::Child => {}
    }
    setsid()?;
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => process::exit(0),
        ForkResult::Child => {}
    }
    chdir("/")?;

    let null = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    dup2_stdin(&null)?;
    dup2_stdout(&null)?;
    dup2_stderr(&null)?;
    Ok(())
}

// ----------------------------------------------------------------------------

/// Writes the PID file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn pidfile(path: &Path) -> Result {
    let mut file = File::create(path)?;
    writeln!(file, "{}", process::id())?;
    Ok(())
}
