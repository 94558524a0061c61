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

//! Event-to-sync translation core.
//!
//! This crate turns a bursty, noisy stream of low-level file system events
//! into a minimal, well-ordered set of subtree synchronization actions, while
//! maintaining a live set of per-directory watches that tracks directory
//! creation and destruction. Transferring data is somebody else's job - the
//! consumer of this crate maps the emitted actions onto an external transfer
//! tool.
//!
//! # Features
//!
//! - Maintains a tree of per-directory watches mirroring the source tree
//! - Coalesces event bursts into batches using quiescence detection
//! - Folds each batch into a hierarchical change tree
//! - Plans a deduplicated, non-overlapping list of sync actions
//! - Applies ignore rules uniformly to watching and event processing

pub mod agent;

pub use agent::changes::{Changes, Mark};
pub use agent::filter::{Filter, Preset};
pub use agent::plan::Action;
pub use agent::{Agent, Batch, Error, Result};
