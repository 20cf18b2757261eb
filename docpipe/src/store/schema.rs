// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Schema creation for the SQLite-backed document store.
//!
//! One `documents` table, with the composite indexes the driver's terminal
//! gather and the executor's cascade delete rely on being efficient.

use sqlx::SqlitePool;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    state       TEXT NOT NULL,
    content     TEXT,
    media_type  TEXT NOT NULL DEFAULT 'text/plain',
    url         TEXT,
    parent_id   TEXT REFERENCES documents(id) ON DELETE CASCADE,
    metadata    TEXT NOT NULL DEFAULT '{}'
)
"#;

const CREATE_INDEX_STATE: &str = "CREATE INDEX IF NOT EXISTS idx_documents_state ON documents(state)";
const CREATE_INDEX_PARENT: &str = "CREATE INDEX IF NOT EXISTS idx_documents_parent_id ON documents(parent_id)";
const CREATE_INDEX_STATE_MEDIA_TYPE: &str =
    "CREATE INDEX IF NOT EXISTS idx_state_media_type ON documents(state, media_type)";
const CREATE_INDEX_PARENT_STATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_parent_state ON documents(parent_id, state)";

/// Create the `documents` table and its indexes if they do not already
/// exist. Safe to call on every engine startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TABLE).execute(pool).await?;
    sqlx::query(CREATE_INDEX_STATE).execute(pool).await?;
    sqlx::query(CREATE_INDEX_PARENT).execute(pool).await?;
    sqlx::query(CREATE_INDEX_STATE_MEDIA_TYPE).execute(pool).await?;
    sqlx::query(CREATE_INDEX_PARENT_STATE).execute(pool).await?;
    Ok(())
}
