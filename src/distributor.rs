//! Static work distribution over scoped worker threads.
//!
//! Units are split into contiguous, near-even chunks (the first
//! `n % workers` chunks take one extra), each chunk is moved into its own
//! thread and processed strictly in order, and all threads are joined
//! before anything is returned. Output is re-sorted by unit index so it
//! does not depend on which worker finished first.

use crate::error::{BenchError, Result};
use crate::report::{Outcome, StageResult};
use crate::unit::FileUnit;
use std::ops::RangeInclusive;
use std::thread;
use std::time::Instant;
use tracing::warn;

/// Anything the distributor can order by unit index
pub trait Indexed {
    fn index(&self) -> usize;
}

impl Indexed for FileUnit {
    fn index(&self) -> usize {
        FileUnit::index(self)
    }
}

/// Chunk sizes for `count` items over at most `workers` workers.
/// Sizes differ by at most one; larger chunks come first.
pub fn partition_sizes(count: usize, workers: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, count);
    let base = count / workers;
    let remainder = count % workers;
    (0..workers)
        .map(|w| if w < remainder { base + 1 } else { base })
        .collect()
}

/// Contiguous 1-based unit index ranges, one per worker
pub fn partition(count: usize, workers: usize) -> Vec<RangeInclusive<usize>> {
    let mut next = 1;
    partition_sizes(count, workers)
        .into_iter()
        .map(|size| {
            let range = next..=next + size - 1;
            next += size;
            range
        })
        .collect()
}

/// First failure a worker ran into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker: usize,
    pub message: String,
}

/// What one worker hands back after processing its whole chunk
struct WorkerReport<T> {
    items: Vec<(T, StageResult)>,
    failure: Option<WorkerFailure>,
}

/// Merged output of every worker, ordered by unit index
#[derive(Debug)]
pub struct Distribution<T> {
    pub units: Vec<T>,
    pub results: Vec<StageResult>,
    pub worker_failures: Vec<WorkerFailure>,
}

fn run_worker<T, F, O>(worker: usize, chunk: Vec<T>, job: &F, observer: &O) -> WorkerReport<T>
where
    T: Indexed,
    F: Fn(&mut T) -> Result<Outcome>,
    O: Fn(&StageResult),
{
    let mut items = Vec::with_capacity(chunk.len());
    let mut failure = None;

    for mut unit in chunk {
        let start = Instant::now();
        let outcome = job(&mut unit);
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(outcome) => StageResult::new(unit.index(), elapsed, outcome),
            Err(e) => {
                if failure.is_none() {
                    failure = Some(WorkerFailure {
                        worker,
                        message: format!("unit {}: {}", unit.index(), e),
                    });
                }
                StageResult::new(unit.index(), elapsed, Outcome::IoFailure).with_detail(e.to_string())
            }
        };
        observer(&result);
        items.push((unit, result));
    }

    WorkerReport { items, failure }
}

/// Run `job` over every unit using up to `workers` threads.
///
/// `observer` sees each result as soon as its worker produces it.
/// Unit-level errors become `IoFailure` results; only a worker thread
/// that dies without reporting is an error here.
pub fn distribute<T, F, O>(units: Vec<T>, workers: usize, job: F, observer: O) -> Result<Distribution<T>>
where
    T: Indexed + Send,
    F: Fn(&mut T) -> Result<Outcome> + Sync,
    O: Fn(&StageResult) + Sync,
{
    let total = units.len();
    let mut remaining = units.into_iter();
    let chunks: Vec<Vec<T>> = partition_sizes(total, workers)
        .into_iter()
        .map(|size| remaining.by_ref().take(size).collect())
        .collect();

    let job = &job;
    let observer = &observer;

    let joined = thread::scope(|scope| -> Result<Vec<thread::Result<WorkerReport<T>>>> {
        let mut handles = Vec::with_capacity(chunks.len());
        for (worker, chunk) in chunks.into_iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("worker-{}", worker))
                .spawn_scoped(scope, move || run_worker(worker, chunk, job, observer))?;
            handles.push(handle);
        }
        // Join every handle before inspecting any of them
        Ok(handles.into_iter().map(|h| h.join()).collect())
    })?;

    let mut items = Vec::with_capacity(total);
    let mut worker_failures = Vec::new();
    for (worker, report) in joined.into_iter().enumerate() {
        let report = report.map_err(|_| BenchError::WorkerPanicked { worker })?;
        if let Some(failure) = report.failure {
            warn!(worker = failure.worker, "{}", failure.message);
            worker_failures.push(failure);
        }
        items.extend(report.items);
    }

    items.sort_by_key(|(unit, _)| unit.index());
    let (units, results) = items.into_iter().unzip();

    Ok(Distribution {
        units,
        results,
        worker_failures,
    })
}
