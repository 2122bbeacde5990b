use crate::unit::Stage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error on {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid copy count: {0}. Must be between 1 and 50")]
    InvalidCopyCount(usize),

    #[error("Invalid worker count: {0}. Must be at least 1")]
    InvalidWorkerCount(usize),

    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Unit {index}: illegal stage transition {from:?} -> {to:?}")]
    StageOrder { index: usize, from: Stage, to: Stage },

    #[error("Phase {requested} requested out of order, expected {expected}")]
    PhaseOrder { expected: String, requested: String },

    #[error("Worker {worker} terminated without producing results")]
    WorkerPanicked { worker: usize },

    #[error("Phase {phase} could not complete: all {failures} units hit storage failures")]
    PhaseFailed { phase: String, failures: usize },
}

impl BenchError {
    /// Wrap an io error with the artifact it concerns
    pub fn storage(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            name: name.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
