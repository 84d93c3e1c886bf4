// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Job and stage *failures* are never errors: they travel as `bool` results.
//! `BuildError` covers unbuildable input and lifecycle/policy violations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Invalid build system: {0}")]
    InvalidSystem(String),

    #[error("Duplicate stage: {0}")]
    DuplicateStage(String),

    #[error("Build system must be closed before running")]
    NotClosed,

    #[error("Graph compiler already finalized")]
    AlreadyFinalized,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid stage range {start}..={stop} for a system with {len} stages")]
    RangeError {
        start: usize,
        stop: usize,
        len: usize,
    },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Build system has no stages to run")]
    EmptySystem,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
