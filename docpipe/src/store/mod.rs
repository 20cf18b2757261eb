// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The concrete persistence backend: a SQLite-backed [`DocumentStore`](docpipe_domain::DocumentStore).

mod schema;
mod sqlite;

pub use sqlite::SqliteDocumentStore;
