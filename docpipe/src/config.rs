// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! The tunables an engine is constructed with (§6 "Configuration
//! (enumerated)"), loadable either programmatically or layered from a file
//! plus environment variables.
//!
//! ## Layering
//!
//! [`EngineConfig::load`] composes, in increasing precedence:
//!
//! 1. [`EngineConfig::default`] — compiled-in defaults.
//! 2. An optional TOML or YAML file, if `config_path` is given.
//! 3. Environment variables prefixed `DOCPIPE_` (e.g. `DOCPIPE_MAX_CONCURRENCY=4`).
//!
//! `document_type` is deliberately absent from this struct: a state graph
//! carries live processor closures and cannot round-trip through a
//! configuration file. It is always bound programmatically via
//! [`crate::engine::DocPipeEngine::new`] or
//! [`crate::engine::DocPipeEngine::rebind`].

use serde::{Deserialize, Serialize};

use docpipe_domain::DocPipeError;

/// Default error-state name, used when [`EngineConfig::error_state`] is left
/// at its default.
pub const DEFAULT_ERROR_STATE: &str = "error";

/// Default upper bound on parallel transition executors.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Connection-pool tuning and behavioral knobs for an engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selects and parameterizes the persistence backend, e.g.
    /// `sqlite://./docpipe.db` or `sqlite::memory:`.
    pub connection_string: String,
    /// Name of the state treated as terminal for failed transitions.
    pub error_state: String,
    /// Upper bound on parallel executors. Must be >= 1.
    pub max_concurrency: usize,
    /// Steady-state connection pool size.
    pub pool_size: u32,
    /// Extra connections allowed above `pool_size` under load; folded into
    /// the pool's hard ceiling since sqlx has no separate overflow pool.
    pub max_overflow: u32,
    pub pool_timeout_secs: u64,
    /// Maximum lifetime of a pooled connection before it is recycled.
    pub pool_recycle_secs: u64,
    /// Whether the backend emits per-statement query traces via `tracing`.
    pub echo: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection_string: "sqlite::memory:".to_string(),
            error_state: DEFAULT_ERROR_STATE.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            pool_size: 5,
            max_overflow: 10,
            pool_timeout_secs: 30,
            pool_recycle_secs: 1800,
            echo: false,
        }
    }
}

impl EngineConfig {
    /// Layer defaults, an optional config file, then `DOCPIPE_`-prefixed
    /// environment variables, and deserialize the result.
    pub fn load(config_path: Option<&str>) -> Result<Self, DocPipeError> {
        let defaults = EngineConfig::default();
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults)
                .map_err(|e| DocPipeError::PersistenceFailure(format!("default config: {e}")))?,
        );

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("DOCPIPE").separator("_"));

        let built = builder
            .build()
            .map_err(|e| DocPipeError::PersistenceFailure(format!("loading config: {e}")))?;

        built
            .try_deserialize()
            .map_err(|e| DocPipeError::PersistenceFailure(format!("parsing config: {e}")))
    }

    pub fn validate(&self) -> Result<(), DocPipeError> {
        if self.max_concurrency < 1 {
            return Err(DocPipeError::GraphInvalid(
                "max_concurrency must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.error_state, "error");
        assert_eq!(cfg.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut cfg = EngineConfig::default();
        cfg.max_concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = EngineConfig::load(None).unwrap();
        assert_eq!(cfg.connection_string, "sqlite::memory:");
    }
}
