use crate::options::{Buffering, IoPath};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(millis(*d))
}

/// Duration as fractional milliseconds
pub fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Wall clock as Unix milliseconds
pub fn unix_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// How a unit left a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    HashMismatch,
    ContentMismatch,
    IoFailure,
}

impl Outcome {
    pub fn is_failure(self) -> bool {
        self != Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Success => "ok",
            Outcome::HashMismatch => "hash mismatch",
            Outcome::ContentMismatch => "content mismatch",
            Outcome::IoFailure => "io failure",
        };
        f.write_str(s)
    }
}

/// The four pipeline phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Duplicate,
    Transform,
    VerifyDecode,
    Compare,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Duplicate,
        Phase::Transform,
        Phase::VerifyDecode,
        Phase::Compare,
    ];

    /// 1-based position in the run
    pub fn number(self) -> usize {
        match self {
            Phase::Duplicate => 1,
            Phase::Transform => 2,
            Phase::VerifyDecode => 3,
            Phase::Compare => 4,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Duplicate => "duplicate",
            Phase::Transform => "transform",
            Phase::VerifyDecode => "verify+decode",
            Phase::Compare => "compare",
        };
        f.write_str(s)
    }
}

/// Result of one unit in one phase. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub index: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub outcome: Outcome,
    /// Storage error text for `IoFailure`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageResult {
    pub fn new(index: usize, elapsed: Duration, outcome: Outcome) -> Self {
        Self {
            index,
            elapsed,
            outcome,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub hash_mismatch: usize,
    pub content_mismatch: usize,
    pub io_failure: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::HashMismatch => self.hash_mismatch += 1,
            Outcome::ContentMismatch => self.content_mismatch += 1,
            Outcome::IoFailure => self.io_failure += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.hash_mismatch + self.content_mismatch + self.io_failure
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mut counts = Self::default();
        for outcome in outcomes {
            counts.record(outcome);
        }
        counts
    }
}

/// Timings and failures of one phase across all live units
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Units that ran in this phase, ordered by index
    pub results: Vec<StageResult>,
    #[serde(rename = "wall_ms", serialize_with = "as_millis")]
    pub wall: Duration,
    pub failed: usize,
    /// Units not run because they already failed in an earlier phase
    pub skipped: usize,
}

impl PhaseReport {
    pub fn new(phase: Phase, results: Vec<StageResult>, wall: Duration, skipped: usize) -> Self {
        let failed = results.iter().filter(|r| r.outcome.is_failure()).count();
        Self {
            phase,
            results,
            wall,
            failed,
            skipped,
        }
    }

    /// Sum of per-unit elapsed times
    pub fn unit_time(&self) -> Duration {
        self.results.iter().map(|r| r.elapsed).sum()
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts::from_outcomes(self.results.iter().map(|r| r.outcome))
    }
}

/// Final verdict for one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    pub index: usize,
    pub outcome: Outcome,
}

/// Everything a run measured, phase-ordered
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub copies: usize,
    pub workers: usize,
    pub buffering: Buffering,
    pub io_path: IoPath,
    pub source_bytes: usize,
    /// TI
    pub started_at_ms: u64,
    /// TFIN
    pub finished_at_ms: u64,
    pub phases: Vec<PhaseReport>,
    /// Final outcome per unit, ordered by index
    pub units: Vec<UnitOutcome>,
    pub outcomes: OutcomeCounts,
    #[serde(rename = "total_ms", serialize_with = "as_millis")]
    pub total: Duration,
    #[serde(rename = "average_per_unit_ms", serialize_with = "as_millis")]
    pub average_per_unit: Duration,
}

impl RunReport {
    pub fn new(
        copies: usize,
        workers: usize,
        buffering: Buffering,
        io_path: IoPath,
        source_bytes: usize,
    ) -> Self {
        Self {
            copies,
            workers,
            buffering,
            io_path,
            source_bytes,
            started_at_ms: unix_millis(SystemTime::now()),
            finished_at_ms: 0,
            phases: Vec::with_capacity(Phase::ALL.len()),
            units: Vec::new(),
            outcomes: OutcomeCounts::default(),
            total: Duration::ZERO,
            average_per_unit: Duration::ZERO,
        }
    }

    pub fn push_phase(&mut self, phase: PhaseReport) {
        self.total += phase.wall;
        self.phases.push(phase);
    }

    /// Seal the report once every unit has settled
    pub fn finalize(&mut self, mut units: Vec<UnitOutcome>) {
        units.sort_by_key(|u| u.index);
        self.outcomes = OutcomeCounts::from_outcomes(units.iter().map(|u| u.outcome));
        self.units = units;

        let unit_time: Duration = self.phases.iter().map(PhaseReport::unit_time).sum();
        self.average_per_unit = if self.copies == 0 {
            Duration::ZERO
        } else {
            unit_time / self.copies as u32
        };
        self.finished_at_ms = unix_millis(SystemTime::now());
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn total_failed(&self) -> usize {
        self.outcomes.failures()
    }
}

/// Baseline vs optimized run
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub baseline: RunReport,
    pub optimized: RunReport,
    /// DF: baseline total minus optimized total, may be negative
    pub difference_ms: f64,
    /// PM: difference as a percentage of the baseline total
    pub improvement_pct: f64,
}

impl Comparison {
    pub fn new(baseline: RunReport, optimized: RunReport) -> Self {
        let base = millis(baseline.total);
        let opt = millis(optimized.total);
        let difference_ms = base - opt;
        let improvement_pct = if base > 0.0 {
            difference_ms / base * 100.0
        } else {
            0.0
        };
        Self {
            baseline,
            optimized,
            difference_ms,
            improvement_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn report_with_total(total: u64) -> RunReport {
        let mut report = RunReport::new(1, 1, Buffering::Unbuffered, IoPath::ReadBack, 0);
        report.push_phase(PhaseReport::new(
            Phase::Duplicate,
            vec![StageResult::new(1, ms(total), Outcome::Success)],
            ms(total),
            0,
        ));
        report.finalize(vec![UnitOutcome {
            index: 1,
            outcome: Outcome::Success,
        }]);
        report
    }

    #[test]
    fn test_phase_report_counts_failures() {
        let results = vec![
            StageResult::new(1, ms(2), Outcome::Success),
            StageResult::new(2, ms(3), Outcome::HashMismatch),
            StageResult::new(3, ms(4), Outcome::IoFailure),
        ];
        let phase = PhaseReport::new(Phase::VerifyDecode, results, ms(5), 1);
        assert_eq!(phase.failed, 2);
        assert_eq!(phase.skipped, 1);
        assert_eq!(phase.unit_time(), ms(9));
        assert_eq!(phase.counts().hash_mismatch, 1);
    }

    #[test]
    fn test_run_totals_and_average() {
        let mut report = RunReport::new(2, 2, Buffering::LargeBuffer, IoPath::InMemory, 8);
        for (phase, wall) in [(Phase::Duplicate, 10), (Phase::Transform, 20)] {
            let results = vec![
                StageResult::new(1, ms(wall / 2), Outcome::Success),
                StageResult::new(2, ms(wall / 2), Outcome::Success),
            ];
            report.push_phase(PhaseReport::new(phase, results, ms(wall), 0));
        }
        report.finalize(vec![
            UnitOutcome { index: 2, outcome: Outcome::ContentMismatch },
            UnitOutcome { index: 1, outcome: Outcome::Success },
        ]);

        assert_eq!(report.total, ms(30));
        assert_eq!(report.average_per_unit, ms(15));
        assert_eq!(report.units[0].index, 1);
        assert_eq!(report.outcomes.success, 1);
        assert_eq!(report.total_failed(), 1);
        assert!(report.finished_at_ms >= report.started_at_ms);
        assert!(report.phase(Phase::Transform).is_some());
        assert!(report.phase(Phase::Compare).is_none());
    }

    #[test]
    fn test_comparison_improvement() {
        let cmp = Comparison::new(report_with_total(200), report_with_total(150));
        assert!((cmp.difference_ms - 50.0).abs() < 1e-9);
        assert!((cmp.improvement_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_comparison_zero_baseline() {
        let cmp = Comparison::new(report_with_total(0), report_with_total(0));
        assert_eq!(cmp.improvement_pct, 0.0);
    }

    #[test]
    fn test_json_uses_millis() {
        let json = serde_json::to_value(report_with_total(12)).unwrap();
        assert_eq!(json["total_ms"], 12.0);
        assert_eq!(json["phases"][0]["phase"], "duplicate");
        assert_eq!(json["phases"][0]["results"][0]["outcome"], "success");
        assert_eq!(json["io_path"], "read-back");
    }
}
