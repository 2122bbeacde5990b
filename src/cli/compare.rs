use crate::error::Result;
use crate::options::{BenchOptions, Buffering, IoPath};
use crate::orchestrator::Pipeline;
use crate::progress::ProgressHandle;
use crate::report::Comparison;
use std::path::Path;

/// Run the pipeline twice over the same source: first re-reading every
/// artifact without stream buffering, then keeping bytes in memory behind
/// large buffers. Artifacts are cleaned between the two runs.
pub fn compare_strategies(
    source: &Path,
    options: &BenchOptions,
    progress: ProgressHandle,
) -> Result<Comparison> {
    let baseline_opts = BenchOptions {
        io_path: IoPath::ReadBack,
        buffering: Buffering::Unbuffered,
        keep_artifacts: false,
        ..options.clone()
    };
    let optimized_opts = BenchOptions {
        io_path: IoPath::InMemory,
        buffering: Buffering::LargeBuffer,
        keep_artifacts: false,
        ..options.clone()
    };

    progress.note("=== baseline: read-back, unbuffered ===");
    let baseline = Pipeline::open(source, baseline_opts, progress.clone())?.run()?;

    progress.note("=== optimized: in-memory, large buffer ===");
    let optimized = Pipeline::open(source, optimized_opts, progress)?.run()?;

    Ok(Comparison::new(baseline, optimized))
}
