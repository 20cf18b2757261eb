// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap
//!
//! The lifecycle concerns that sit outside the domain and engine layers:
//! shutdown coordination and a lightweight logger for the engine's
//! construction phase (§10 "Lifecycle").
//!
//! `docpipe`'s engine takes a [`shutdown::CancellationToken`] so its driver
//! loop (§4.6) and scheduler (§4.5) can be cancelled gracefully: in-flight
//! transition executors finish, queued ones are dropped.
//!
//! CLI parsing, signal handling, and platform abstraction — present in this
//! crate's origin — are out of scope here; the engine is a library, not a
//! standalone process.

pub mod logger;
pub mod shutdown;

pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
