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

//! Continuous directory mirroring agent.

use clap::Parser;
use livesync_watch::agent::plan;
use livesync_watch::{Action, Agent, Batch};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::fs;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

mod daemon;
mod error;
mod logging;
mod options;
mod transfer;

use error::Result;
use options::Options;
use transfer::Transfer;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Program entry point.
fn main() {
    let options = match Options::parse().validate() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("livesync: {err}");
            process::exit(err.exit_code());
        }
    };

    if let Err(err) = run(&options) {
        // Syslog receives this through the log facade; stderr is written
        // directly, as the subscriber may not be installed yet, and it only
        // goes anywhere while the process is still attached to a terminal
        if options.syslog {
            error!("fatal: {err}");
        }
        if !options.daemon {
            eprintln!("livesync: fatal: {err}");
        }
        process::exit(err.exit_code());
    }
}

// ----------------------------------------------------------------------------

/// Runs the agent until a termination signal arrives.
///
/// The sequence is fixed: detach if asked to, set up diagnostics, write the
/// PID file, establish the watch set, perform one full sync to create a
/// consistent baseline, then alternate between waiting for a batch, planning
/// and executing. An event queue overflow degrades gracefully into a fresh
/// watch set plus another full sync.
fn run(options: &Options) -> Result {
    if options.daemon {
        daemon::detach()?;
    }
    logging::init(options)?;
    if let Some(path) = &options.pidfile {
        daemon::pidfile(path)?;
    }

    // The first signal asks the main loop to wind down, a second one
    // terminates on the spot
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        flag::register_conditional_shutdown(signal, 0, Arc::clone(&stop))?;
        flag::register(signal, Arc::clone(&stop))?;
    }

    let mut agent = Agent::new(
        options.from.clone(),
        options.filter()?,
        options.quiescence(),
        options.delete,
    )?;
    agent.scan()?;
    info!(
        "watching {} directories under {}",
        agent.watches(),
        options.from.display()
    );
    if options.to.is_empty() {
        warn!("no destinations given, running in debug-only mode");
    }

    // One recursive action over the whole source establishes the baseline
    let transfer = Transfer::new(options);
    let full = Action::subtree(options.from.clone(), options.delete);
    transfer.execute(&[full.clone()]);

    while !stop.load(Ordering::Relaxed) {
        match agent.next_batch(&stop)? {
            Batch::Interrupted => break,
            Batch::Overflow => {
                warn!("event queue overflowed, resynchronizing everything");
                agent.rescan()?;
                transfer.execute(&[full.clone()]);
            }
            Batch::Changes(changes) => {
                let actions = plan::actions(
                    &changes,
                    &options.from,
                    options.full_sync_threshold,
                );
                transfer.execute(&actions);
            }
        }
    }

    if let Some(path) = &options.pidfile {
        let _ = fs::remove_file(path);
    }
    info!("terminating");
    Ok(())
}
