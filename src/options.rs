use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Highest copy count a run accepts
pub const MAX_COPIES: usize = 50;

/// Upper bound on workers when none are requested explicitly
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Buffer capacity used by [`Buffering::LargeBuffer`]
pub const LARGE_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Storage buffering policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Buffering {
    /// Plain whole-file reads and writes
    Unbuffered,
    /// Reads and writes go through an 8 MiB stream buffer
    #[default]
    #[serde(rename = "large")]
    LargeBuffer,
}

impl std::str::FromStr for Buffering {
    type Err = BenchError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "unbuffered" | "none" => Ok(Self::Unbuffered),
            "large" | "large-buffer" => Ok(Self::LargeBuffer),
            _ => Err(BenchError::UnsupportedOption(format!("buffering: {}", s))),
        }
    }
}

impl std::fmt::Display for Buffering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbuffered => f.write_str("unbuffered"),
            Self::LargeBuffer => f.write_str("large"),
        }
    }
}

/// Where each stage takes its input bytes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IoPath {
    /// Re-read every artifact right after writing it
    ReadBack,
    /// Bytes just written stay authoritative; only the stored digest is re-read
    #[default]
    InMemory,
}

impl std::str::FromStr for IoPath {
    type Err = BenchError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "read-back" | "readback" | "base" => Ok(Self::ReadBack),
            "in-memory" | "memory" | "optimized" => Ok(Self::InMemory),
            _ => Err(BenchError::UnsupportedOption(format!("io path: {}", s))),
        }
    }
}

impl std::fmt::Display for IoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadBack => f.write_str("read-back"),
            Self::InMemory => f.write_str("in-memory"),
        }
    }
}

/// Options for one benchmark run
#[derive(Debug, Clone)]
pub struct BenchOptions {
    /// Number of copies of the source file (1..=50)
    pub copies: usize,
    pub workers: usize,
    pub buffering: Buffering,
    pub io_path: IoPath,
    /// Directory for derived artifacts. `None` creates a scratch directory
    /// under the system temp dir and removes it afterwards.
    pub work_dir: Option<PathBuf>,
    pub keep_artifacts: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            copies: 1,
            workers: default_workers(),
            buffering: Buffering::default(),
            io_path: IoPath::default(),
            work_dir: None,
            keep_artifacts: false,
        }
    }
}

impl BenchOptions {
    pub fn validate(&self) -> Result<()> {
        if self.copies == 0 || self.copies > MAX_COPIES {
            return Err(BenchError::InvalidCopyCount(self.copies));
        }
        if self.workers == 0 {
            return Err(BenchError::InvalidWorkerCount(self.workers));
        }
        Ok(())
    }
}

/// min(4, available hardware parallelism)
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(DEFAULT_MAX_WORKERS)
}
