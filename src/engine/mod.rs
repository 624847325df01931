//! The isolated command-execution engine.
//!
//! Each command runs in its own worker, bounded by a process-wide timeout;
//! crashes, hangs and device errors all collapse into the taxonomy in
//! [`error`]. Concurrent invocations are independent by construction: every
//! call gets a fresh channel and a fresh worker, and nothing is shared.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// One-shot pipe transport between parent and worker.
pub mod channel;
/// Public entry point mapping worker outcomes to replies and errors.
pub mod dispatcher;
/// Error taxonomy surfaced to callers.
pub mod error;
/// Pluggable worker spawn backends.
pub mod spawn;
/// Worker lifecycle: spawn, forced termination, reaping.
pub mod supervisor;
/// Code that runs inside the worker.
pub mod worker;

pub use dispatcher::{execute_cdb, execute_cdb_on};
pub use error::CommandError;
