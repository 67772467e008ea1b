//! Error Types
//!
//! This module defines the error types used throughout the cache.
//!
//! # Overview
//!
//! The main error type [`KilnError`] covers every failure mode of the
//! compilation pipeline:
//! - Compiler rejections and missing shader sources
//! - Disk cache corruption
//! - Native program creation failures
//! - I/O, settings and file watcher errors
//!
//! # Propagation
//!
//! None of these errors ever reach the render thread. Lookups return
//! `Option`; errors are absorbed at the worker boundary, logged, and counted
//! as failed tasks.
//!
//! ```rust,ignore
//! use kiln::errors::{KilnError, Result};
//!
//! fn load_blob() -> Result<Vec<u8>> {
//!     Ok(std::fs::read("Lighting.vso")?)
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the shader cache.
#[derive(Error, Debug)]
pub enum KilnError {
    // ========================================================================
    // Compilation Errors
    // ========================================================================
    /// The shader compiler rejected the source or the define list.
    #[error("Failed to compile {task}: {diagnostics}")]
    Compile {
        /// Human readable task identity (`family:class:descriptor`)
        task: String,
        /// Full diagnostic text reported by the toolchain
        diagnostics: String,
    },

    /// The shader source file does not exist.
    #[error("Shader source not found: {0}")]
    MissingSource(PathBuf),

    /// The external compiler could not be launched.
    #[error("Failed to launch shader compiler `{tool}`: {source}")]
    ToolchainUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Disk Cache Errors
    // ========================================================================
    /// A stored blob is unreadable or does not match its header.
    #[error("Disk cache entry corrupt at {path}: {reason}")]
    DiskCacheCorrupt { path: PathBuf, reason: String },

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The device refused to create a native program from valid bytecode.
    #[error("Failed to create {class} program: {reason}")]
    ProgramCreation { class: String, reason: String },

    // ========================================================================
    // Invariant Violations
    // ========================================================================
    /// A task was completed twice or completed without being taken.
    #[error("Concurrency invariant violated: {0}")]
    ConcurrencyViolation(String),

    // ========================================================================
    // I/O & Configuration Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error (settings, disk cache info).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source file watcher error.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

impl KilnError {
    /// Returns `true` for errors that mean "this task can never produce a
    /// program until its inputs change".
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Compile { .. } | Self::MissingSource(_) | Self::ProgramCreation { .. }
        )
    }
}

/// Alias for `Result<T, KilnError>`.
pub type Result<T> = std::result::Result<T, KilnError>;
