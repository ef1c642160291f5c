//! Evaluation reports.
//!
//! A report bundles the per-sequence results of a run with an overall
//! block derived by summing the raw counters across sequences and
//! re-deriving every metric from the sums. Ratio metrics are never
//! averaged across sequences.

use crate::accumulator::{EvalCounts, MetricsSummary};
use crate::identity::CoverageStats;
use serde::Serialize;
use std::fmt;

/// Counters, coverage statistics and derived metrics of one sequence.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceResult {
    /// Sequence name from the configuration.
    pub name: String,
    /// Raw event counters.
    pub counts: EvalCounts,
    /// Per-track coverage statistics.
    pub coverage: CoverageStats,
    /// Metrics derived from `counts`.
    pub metrics: MetricsSummary,
}

/// A sequence excluded from the totals, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSequence {
    pub name: String,
    pub reason: String,
}

/// Aggregated outcome of an evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    /// Totals over every evaluated sequence.
    pub overall: SequenceResult,
    /// Per-sequence results in configuration order.
    pub sequences: Vec<SequenceResult>,
    /// Sequences that could not be evaluated.
    pub skipped: Vec<SkippedSequence>,
}

impl EvalReport {
    /// Build a report from per-sequence results, deriving the overall block.
    pub fn new(sequences: Vec<SequenceResult>, skipped: Vec<SkippedSequence>) -> Self {
        let mut counts = EvalCounts::default();
        let mut coverage = CoverageStats::default();
        for result in &sequences {
            counts.merge(&result.counts);
            coverage.merge(&result.coverage);
        }
        let overall = SequenceResult {
            name: "OVERALL".to_string(),
            metrics: counts.summarize(),
            counts,
            coverage,
        };
        Self {
            overall,
            sequences,
            skipped,
        }
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .sequences
            .iter()
            .map(|r| r.name.len())
            .chain(std::iter::once(self.overall.name.len()))
            .max()
            .unwrap_or(0)
            .max("Sequence".len());

        writeln!(
            f,
            "{:<width$}  {:>7} {:>7} {:>7} {:>5}  {:>6} {:>6} {:>7} {:>6} {:>6}  {:>3} {:>3} {:>3} {:>5}",
            "Sequence",
            "TP",
            "FP",
            "FN",
            "IDsw",
            "Prec",
            "Rec",
            "MOTA",
            "IDF1",
            "MOTP",
            "MT",
            "PT",
            "ML",
            "Frag",
            width = name_width,
        )?;
        for result in &self.sequences {
            write_row(f, name_width, result)?;
        }
        write_row(f, name_width, &self.overall)?;
        for skip in &self.skipped {
            writeln!(f, "skipped: {} ({})", skip.name, skip.reason)?;
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name_width: usize, r: &SequenceResult) -> fmt::Result {
    writeln!(
        f,
        "{:<width$}  {:>7} {:>7} {:>7} {:>5}  {:>6.3} {:>6.3} {:>7.3} {:>6.3} {:>6.3}  {:>3} {:>3} {:>3} {:>5}",
        r.name,
        r.counts.true_positives,
        r.counts.false_positives,
        r.counts.false_negatives,
        r.counts.id_switches,
        r.metrics.precision,
        r.metrics.recall,
        r.metrics.mota,
        r.metrics.idf1,
        r.metrics.motp,
        r.coverage.mostly_tracked,
        r.coverage.partially_tracked,
        r.coverage.mostly_lost,
        r.coverage.fragmentations,
        width = name_width,
    )
}
