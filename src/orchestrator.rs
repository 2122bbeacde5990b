//! Phase sequencing across the whole unit set.
//!
//! ```text
//! Duplicate → Transform (encode + digest) → Verify+Decode → Compare
//! ```
//!
//! Every phase fans out to the distributor and fully joins before the next
//! one starts. Units that fail are parked and skipped by later phases; the
//! run itself only aborts when a worker dies or every unit of a phase hits
//! a storage failure.

use crate::distributor::distribute;
use crate::error::{BenchError, Result};
use crate::options::{BenchOptions, IoPath};
use crate::progress::{ProgressEvent, ProgressHandle};
use crate::report::{millis, Outcome, Phase, PhaseReport, RunReport, UnitOutcome};
use crate::storage::{read_file, Storage};
use crate::unit::FileUnit;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

static SCRATCH_SEQ: AtomicUsize = AtomicUsize::new(0);

fn scratch_dir() -> PathBuf {
    let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("cipherbench-{}-{}", std::process::id(), seq))
}

/// Work directory the pipeline created for itself. Removed on drop unless
/// artifacts are kept, so an unfinished pipeline leaves nothing behind.
#[derive(Debug)]
struct ScratchDir {
    storage: Storage,
    keep: bool,
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.keep || !self.storage.root().exists() {
            return;
        }
        if let Err(e) = self.storage.purge_root() {
            warn!("could not remove work directory: {}", e);
        }
    }
}

/// Read-only inputs shared by every worker during a phase
struct PhaseContext<'a> {
    source: &'a [u8],
    storage: &'a Storage,
    io_path: IoPath,
}

pub struct Pipeline {
    source: Vec<u8>,
    storage: Storage,
    options: BenchOptions,
    units: Vec<FileUnit>,
    report: RunReport,
    progress: ProgressHandle,
    scratch: Option<ScratchDir>,
}

impl Pipeline {
    /// Read the source file once and prepare a run over it
    pub fn open(source_path: &Path, options: BenchOptions, progress: ProgressHandle) -> Result<Self> {
        if !source_path.is_file() {
            return Err(BenchError::SourceNotFound(source_path.to_path_buf()));
        }
        let source = read_file(source_path, options.buffering)?;
        Self::with_source(source, options, progress)
    }

    /// Prepare a run over an in-memory source blob
    pub fn with_source(source: Vec<u8>, options: BenchOptions, progress: ProgressHandle) -> Result<Self> {
        options.validate()?;

        let (root, owns_work_dir) = match &options.work_dir {
            Some(dir) => (dir.clone(), false),
            None => (scratch_dir(), true),
        };
        let storage = Storage::new(root, options.buffering);
        let created = storage.create_root()?;
        let scratch = (owns_work_dir && created).then(|| ScratchDir {
            storage: storage.clone(),
            keep: options.keep_artifacts,
        });

        let workers = options.workers.min(options.copies);
        let report = RunReport::new(
            options.copies,
            workers,
            options.buffering,
            options.io_path,
            source.len(),
        );
        let units = (1..=options.copies).map(FileUnit::new).collect();

        debug!(
            root = %storage.root().display(),
            copies = options.copies,
            workers,
            "pipeline ready"
        );

        Ok(Self {
            source,
            storage,
            options,
            units,
            report,
            progress,
            scratch,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn units(&self) -> &[FileUnit] {
        &self.units
    }

    /// Report so far; phase entries appear as phases complete
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    fn next_phase(&self) -> Option<Phase> {
        Phase::ALL.get(self.report.phases.len()).copied()
    }

    fn run_phase<F>(&mut self, phase: Phase, job: F) -> Result<&PhaseReport>
    where
        F: Fn(&mut FileUnit, &PhaseContext<'_>) -> Result<Outcome> + Sync,
    {
        if self.next_phase() != Some(phase) {
            return Err(BenchError::PhaseOrder {
                expected: self
                    .next_phase()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "none".into()),
                requested: phase.to_string(),
            });
        }

        let (live, parked): (Vec<FileUnit>, Vec<FileUnit>) =
            std::mem::take(&mut self.units).into_iter().partition(FileUnit::is_live);
        let skipped = parked.len();

        self.progress.send(ProgressEvent::PhaseStarted {
            phase,
            units: live.len(),
        });

        let ctx = PhaseContext {
            source: &self.source,
            storage: &self.storage,
            io_path: self.options.io_path,
        };
        let progress = &self.progress;
        let started = Instant::now();

        let dist = distribute(
            live,
            self.options.workers,
            |unit: &mut FileUnit| job(unit, &ctx),
            |result| {
                progress.send(ProgressEvent::UnitFinished {
                    phase,
                    index: result.index,
                    outcome: result.outcome,
                    elapsed: result.elapsed,
                })
            },
        )?;
        let wall = started.elapsed();

        let mut units = dist.units;
        units.extend(parked);
        units.sort_by_key(FileUnit::index);
        self.units = units;

        let phase_report = PhaseReport::new(phase, dist.results, wall, skipped);
        let ran = phase_report.results.len();
        let io_failures = phase_report.counts().io_failure;

        info!(
            %phase,
            wall_ms = millis(wall),
            failed = phase_report.failed,
            skipped,
            "phase complete"
        );
        self.progress.send(ProgressEvent::PhaseFinished {
            phase,
            wall,
            failed: phase_report.failed,
        });
        self.report.push_phase(phase_report);

        if ran > 0 && io_failures == ran {
            return Err(BenchError::PhaseFailed {
                phase: phase.to_string(),
                failures: io_failures,
            });
        }

        Ok(&self.report.phases[self.report.phases.len() - 1])
    }

    /// Phase 1: write every copy
    pub fn duplicate(&mut self) -> Result<&PhaseReport> {
        self.run_phase(Phase::Duplicate, |unit, cx| unit.duplicate(cx.source, cx.storage))
    }

    /// Phase 2: encode each copy and persist its digest
    pub fn transform(&mut self) -> Result<&PhaseReport> {
        self.run_phase(Phase::Transform, |unit, cx| unit.transform(cx.storage, cx.io_path))
    }

    /// Phase 3: check stored digests and decode the ones that verify
    pub fn verify_and_decode(&mut self) -> Result<&PhaseReport> {
        self.run_phase(Phase::VerifyDecode, |unit, cx| {
            unit.verify_and_decode(cx.storage, cx.io_path)
        })
    }

    /// Phase 4: compare decoded bytes with the source
    pub fn compare(&mut self) -> Result<&PhaseReport> {
        self.run_phase(Phase::Compare, |unit, cx| {
            unit.compare(cx.source, cx.storage, cx.io_path)
        })
    }

    fn run_phases(&mut self) -> Result<()> {
        self.duplicate()?;
        self.transform()?;
        self.verify_and_decode()?;
        self.compare()?;
        Ok(())
    }

    /// Drive all four phases, clean up, and return the finished report.
    /// Artifacts are removed even when a phase aborts the run.
    pub fn run(mut self) -> Result<RunReport> {
        let outcome = self.run_phases();
        self.cleanup();
        outcome?;
        Ok(self.finish())
    }

    /// Remove every derived artifact unless asked to keep them.
    /// Returns the number of files removed.
    pub fn cleanup(&self) -> usize {
        if self.options.keep_artifacts {
            return 0;
        }

        let mut removed = 0;
        for index in 1..=self.options.copies {
            match self.storage.remove_unit(index) {
                Ok(n) => removed += n,
                Err(e) => warn!(unit = index, "cleanup failed: {}", e),
            }
        }
        if self.scratch.is_some() {
            if let Err(e) = self.storage.remove_root() {
                warn!("could not remove work directory: {}", e);
            }
        }
        debug!(removed, "artifacts cleaned up");
        removed
    }

    /// Seal the report with each unit's final outcome
    pub fn finish(mut self) -> RunReport {
        let units = self
            .units
            .iter()
            .filter_map(|u| {
                u.final_outcome().map(|outcome| UnitOutcome {
                    index: u.index(),
                    outcome,
                })
            })
            .collect();
        self.report.finalize(units);
        self.report
    }
}
