//! Running evaluation counters and derived metric summaries.

use crate::matching::FrameAssignment;
use serde::Serialize;

/// Raw evaluation counters for one sequence or an aggregate.
///
/// Every field is a plain sum, so totals over several sequences come from
/// merging counters and deriving the summary once at the end, never from
/// averaging per-sequence ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EvalCounts {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub id_switches: u64,
    /// Ground-truth observations inside the evaluation window.
    pub gt_total: u64,
    /// Predicted observations inside the evaluation window.
    pub pred_total: u64,
    /// Sum of IoU over true positives, for MOTP.
    pub iou_total: f64,
    pub frames: u64,
}

impl EvalCounts {
    /// Fold one frame's assignment into the counters.
    ///
    /// # Arguments
    /// * `gt_count` - Ground-truth observations present this frame
    /// * `pred_count` - Predicted observations present this frame
    /// * `assignment` - The frame's matching outcome
    /// * `switches` - Identity switches this frame contributed
    pub fn record_frame(
        &mut self,
        gt_count: usize,
        pred_count: usize,
        assignment: &FrameAssignment,
        switches: u64,
    ) {
        self.true_positives += assignment.matches.len() as u64;
        self.false_positives += assignment.unmatched_pred.len() as u64;
        self.false_negatives += assignment.unmatched_gt.len() as u64;
        self.id_switches += switches;
        self.gt_total += gt_count as u64;
        self.pred_total += pred_count as u64;
        self.iou_total += assignment.iou_total();
        self.frames += 1;
    }

    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &EvalCounts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.id_switches += other.id_switches;
        self.gt_total += other.gt_total;
        self.pred_total += other.pred_total;
        self.iou_total += other.iou_total;
        self.frames += other.frames;
    }

    /// Derive summary metrics from the counters.
    ///
    /// Reads only, so calling it repeatedly on unchanged counters yields
    /// the same summary. Every ratio reports 0 on a zero denominator; in
    /// particular a sequence with no ground truth reports MOTA 0 rather
    /// than failing.
    pub fn summarize(&self) -> MetricsSummary {
        let tp = self.true_positives as f64;

        let precision = ratio(tp, (self.true_positives + self.false_positives) as f64);
        let recall = ratio(tp, (self.true_positives + self.false_negatives) as f64);
        let idf1 = ratio(2.0 * tp, (self.gt_total + self.pred_total) as f64);
        let motp = ratio(self.iou_total, tp);

        // MOTA charges every miss, false positive and switch against the
        // ground-truth total; it has no floor and can go negative.
        let mota = if self.gt_total == 0 {
            0.0
        } else {
            1.0 - (self.false_positives + self.false_negatives + self.id_switches) as f64
                / self.gt_total as f64
        };

        MetricsSummary {
            precision,
            recall,
            mota,
            idf1,
            motp,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Derived metrics for one sequence or an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub precision: f64,
    pub recall: f64,
    pub mota: f64,
    pub idf1: f64,
    /// Mean IoU over matched pairs (similarity convention, higher is better).
    pub motp: f64,
}
