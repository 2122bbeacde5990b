use crate::error::Result;
use crate::options::BenchOptions;
use crate::orchestrator::Pipeline;
use crate::progress::ProgressHandle;
use crate::report::RunReport;
use std::path::Path;

/// Run the full pipeline over `source` with the given options
pub fn run_benchmark(
    source: &Path,
    options: &BenchOptions,
    progress: ProgressHandle,
) -> Result<RunReport> {
    let pipeline = Pipeline::open(source, options.clone(), progress)?;
    pipeline.run()
}
