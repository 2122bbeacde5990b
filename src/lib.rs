//! Cipherbench - parallel encode/verify/decode benchmark
//!
//! Copies one source file N times, then drives every copy through a fixed
//! pipeline using a small pool of worker threads, timing each unit of work
//! and each phase.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Duplicate → Encode → Digest → Verify → Decode → Compare → Report
//! ```
//!
//! - **Duplicate**: write copy `i` as `i.txt`
//! - **Encode**: rotate letters by three, map digits `d → 9-d`, in place
//! - **Digest**: SHA-256 of the encoded copy, stored as lowercase hex in `i.sha`
//! - **Verify**: recompute the digest and check it against `i.sha`
//! - **Decode**: invert the encoding into `i_2.txt`
//! - **Compare**: byte-for-byte equality of `i_2.txt` with the source
//!
//! A unit that fails any step is parked and skipped by later phases; the
//! others carry on.
//!
//! ## Example
//!
//! ```no_run
//! use cipherbench::cli::run_benchmark;
//! use cipherbench::options::BenchOptions;
//! use cipherbench::progress::ProgressHandle;
//! use std::path::Path;
//!
//! let options = BenchOptions {
//!     copies: 8,
//!     ..Default::default()
//! };
//! let report = run_benchmark(Path::new("original.txt"), &options, ProgressHandle::disabled()).unwrap();
//! println!("{} of {} copies verified", report.outcomes.success, report.copies);
//! ```

pub mod cli;
pub mod distributor;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod storage;
pub mod unit;

pub use error::{BenchError, Result};
pub use options::{BenchOptions, Buffering, IoPath};
pub use orchestrator::Pipeline;
pub use report::{Comparison, Outcome, Phase, RunReport};
