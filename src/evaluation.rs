//! Evaluation driver.
//!
//! [`Evaluator`] orchestrates a run: it resolves each sequence's frame
//! count, loads the ground-truth and predicted stores, folds the
//! per-frame matcher output into counters and identity state, and
//! aggregates per-sequence results into an [`EvalReport`].

use crate::accumulator::EvalCounts;
use crate::config::{EvalConfig, SequenceSpec};
use crate::identity::{CoverageStats, IdentityTracker};
use crate::matching::{match_frame, FrameAssignment};
use crate::observation::{Observation, Source};
use crate::report::{EvalReport, SequenceResult, SkippedSequence};
use crate::seqinfo::SequenceInfo;
use crate::store::{FrameWindow, TrackStore};
use crate::{Error, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;

/// Drives the evaluation of one or more sequences under a shared
/// configuration.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    /// Create an evaluator, validating the configuration up front.
    ///
    /// # Arguments
    /// * `config` - Matcher and driver settings for the run
    ///
    /// # Returns
    /// The evaluator, or `Error::Config` if the settings are unusable.
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate every configured sequence and aggregate the results.
    ///
    /// A sequence whose inputs are missing or unreadable is skipped with
    /// a warning and listed in the report; the run fails with
    /// `Error::AllSequencesFailed` only when no sequence could be
    /// evaluated. An invariant violation aborts the whole run.
    pub fn evaluate(&self, sequences: &[SequenceSpec]) -> Result<EvalReport> {
        if sequences.is_empty() {
            return Err(Error::Config("no sequences configured".to_string()));
        }

        let outcomes: Vec<Result<SequenceResult>> = if self.config.parallel {
            // All outcomes are collected; fatal errors surface in the
            // fold below.
            sequences
                .par_iter()
                .map(|spec| self.evaluate_sequence(spec))
                .collect()
        } else {
            let mut serial = Vec::with_capacity(sequences.len());
            for spec in sequences {
                match self.evaluate_sequence(spec) {
                    Err(err) if !err.is_sequence_failure() => return Err(err),
                    outcome => serial.push(outcome),
                }
            }
            serial
        };

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for (spec, outcome) in sequences.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) if err.is_sequence_failure() => {
                    warn!("sequence '{}' skipped: {}", spec.name, err);
                    skipped.push(SkippedSequence {
                        name: spec.name.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if results.is_empty() {
            return Err(Error::AllSequencesFailed(sequences.len()));
        }

        Ok(EvalReport::new(results, skipped))
    }

    /// Evaluate a single sequence from its configured inputs.
    pub fn evaluate_sequence(&self, spec: &SequenceSpec) -> Result<SequenceResult> {
        let length = self.resolve_length(spec)?;
        let window = FrameWindow::new(length, spec.frame_offset)?;

        debug!(
            "loading '{}': {} frames, offset {}",
            spec.name, length, spec.frame_offset
        );
        let gt = TrackStore::load(&spec.gt_path, Source::GroundTruth, window, &self.config.classes)?;
        let pred = TrackStore::load(&spec.pred_path, Source::Predicted, window, &self.config.classes)?;

        let (counts, coverage) = self.evaluate_pair(&gt, &pred)?;
        let metrics = counts.summarize();
        info!(
            "'{}': {} gt / {} pred observations, MOTA {:.3}, IDF1 {:.3}",
            spec.name, counts.gt_total, counts.pred_total, metrics.mota, metrics.idf1
        );

        Ok(SequenceResult {
            name: spec.name.clone(),
            counts,
            coverage,
            metrics,
        })
    }

    /// Run the frame-ordered fold over two pre-loaded stores.
    ///
    /// Frames are visited in strictly increasing order; switch detection
    /// and fragmentation counting depend on that adjacency. Each frame's
    /// assignment is verified against the frame's observations before it
    /// is folded in.
    pub fn evaluate_pair(
        &self,
        gt: &TrackStore,
        pred: &TrackStore,
    ) -> Result<(EvalCounts, CoverageStats)> {
        let num_frames = gt.num_frames().max(pred.num_frames());
        let mut identity = IdentityTracker::new();
        let mut counts = EvalCounts::default();

        for frame in 1..=num_frames {
            let gt_frame = gt.observations_at(frame);
            let pred_frame = pred.observations_at(frame);

            let assignment = match_frame(gt_frame, pred_frame, self.config.iou_threshold);
            verify_assignment(frame, &assignment, gt_frame, pred_frame)?;

            let switches = identity.observe_frame(&assignment);
            counts.record_frame(gt_frame.len(), pred_frame.len(), &assignment, switches);
        }

        Ok((counts, identity.coverage_stats()))
    }

    fn resolve_length(&self, spec: &SequenceSpec) -> Result<u32> {
        if let Some(length) = spec.seq_length {
            return Ok(length);
        }
        if let Some(path) = &spec.seqinfo {
            return Ok(SequenceInfo::from_file(path)?.seq_length);
        }
        Err(Error::Config(format!(
            "sequence '{}' has neither seq_length nor a seqinfo file",
            spec.name
        )))
    }
}

/// Check an assignment against the frame it was computed from.
///
/// Every matched identity must exist in the frame's observations and no
/// identity may appear in more than one committed match. A failure here
/// means corrupted matcher state and aborts the run.
fn verify_assignment(
    frame: u32,
    assignment: &FrameAssignment,
    gt: &[Observation],
    pred: &[Observation],
) -> Result<()> {
    let gt_ids: HashSet<i64> = gt.iter().map(|obs| obs.identity).collect();
    let pred_ids: HashSet<i64> = pred.iter().map(|obs| obs.identity).collect();

    let mut matched_gt = HashSet::with_capacity(assignment.matches.len());
    let mut matched_pred = HashSet::with_capacity(assignment.matches.len());

    for pair in &assignment.matches {
        if !gt_ids.contains(&pair.gt_id) {
            return Err(Error::InvariantViolation(format!(
                "frame {}: match references ground-truth identity {} not present in the frame",
                frame, pair.gt_id
            )));
        }
        if !pred_ids.contains(&pair.pred_id) {
            return Err(Error::InvariantViolation(format!(
                "frame {}: match references predicted identity {} not present in the frame",
                frame, pair.pred_id
            )));
        }
        if !matched_gt.insert(pair.gt_id) {
            return Err(Error::InvariantViolation(format!(
                "frame {}: ground-truth identity {} matched more than once",
                frame, pair.gt_id
            )));
        }
        if !matched_pred.insert(pair.pred_id) {
            return Err(Error::InvariantViolation(format!(
                "frame {}: predicted identity {} matched more than once",
                frame, pair.pred_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchedPair;
    use crate::observation::BoundingBox;
    use approx::assert_relative_eq;

    fn obs(frame: u32, identity: i64, left: f64, source: Source) -> Observation {
        Observation::new(
            frame,
            identity,
            BoundingBox::new(left, 0.0, 10.0, 10.0),
            0,
            source,
        )
    }

    fn store_of(source: Source, length: u32, observations: Vec<Observation>) -> TrackStore {
        let window = FrameWindow::new(length, 0).unwrap();
        TrackStore::from_observations(source, window, observations).unwrap()
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(EvalConfig::default()).unwrap()
    }

    // ===== Configuration =====

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EvalConfig {
            iou_threshold: 0.0,
            ..EvalConfig::default()
        };
        assert!(matches!(Evaluator::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_evaluate_rejects_empty_sequence_list() {
        let err = evaluator().evaluate(&[]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolve_length_prefers_inline_value() {
        let mut spec = SequenceSpec::new("S", "gt.txt", "pred.txt");
        spec.seq_length = Some(42);
        spec.seqinfo = Some("/nonexistent/seqinfo.ini".into());
        // The inline value wins; the seqinfo file is never read.
        assert_eq!(evaluator().resolve_length(&spec).unwrap(), 42);
    }

    #[test]
    fn test_resolve_length_without_any_source_fails() {
        let spec = SequenceSpec::new("S", "gt.txt", "pred.txt");
        let err = evaluator().resolve_length(&spec).unwrap_err();
        assert!(err.to_string().contains("neither"));
    }

    // ===== Frame fold =====

    #[test]
    fn test_perfect_tracking_over_four_frames() {
        let gt = store_of(
            Source::GroundTruth,
            4,
            (1..=4).map(|f| obs(f, 5, 0.0, Source::GroundTruth)).collect(),
        );
        let pred = store_of(
            Source::Predicted,
            4,
            (1..=4).map(|f| obs(f, 10, 0.0, Source::Predicted)).collect(),
        );

        let (counts, coverage) = evaluator().evaluate_pair(&gt, &pred).unwrap();

        assert_eq!(counts.true_positives, 4);
        assert_eq!(counts.false_positives, 0);
        assert_eq!(counts.false_negatives, 0);
        assert_eq!(counts.id_switches, 0);

        let metrics = counts.summarize();
        assert_relative_eq!(metrics.mota, 1.0);
        assert_relative_eq!(metrics.idf1, 1.0);
        assert_relative_eq!(metrics.motp, 1.0);

        assert_eq!(coverage.mostly_tracked, 1);
        assert_eq!(coverage.fragmentations, 0);
    }

    #[test]
    fn test_identity_handover_counts_one_switch() {
        // Prediction 10 covers ground truth 5 for two frames, then
        // prediction 11 takes over.
        let gt = store_of(
            Source::GroundTruth,
            4,
            (1..=4).map(|f| obs(f, 5, 0.0, Source::GroundTruth)).collect(),
        );
        let pred = store_of(
            Source::Predicted,
            4,
            vec![
                obs(1, 10, 0.0, Source::Predicted),
                obs(2, 10, 0.0, Source::Predicted),
                obs(3, 11, 0.0, Source::Predicted),
                obs(4, 11, 0.0, Source::Predicted),
            ],
        );

        let (counts, coverage) = evaluator().evaluate_pair(&gt, &pred).unwrap();

        assert_eq!(counts.true_positives, 4);
        assert_eq!(counts.id_switches, 1);
        assert_relative_eq!(counts.summarize().mota, 0.75);
        assert_eq!(coverage.mostly_tracked, 1);
    }

    #[test]
    fn test_detection_gap_fragments_without_switching() {
        // Prediction 10 misses frame 3 entirely; re-acquiring ground
        // truth 5 in frame 4 is a fragmentation, not a switch.
        let gt = store_of(
            Source::GroundTruth,
            4,
            (1..=4).map(|f| obs(f, 5, 0.0, Source::GroundTruth)).collect(),
        );
        let pred = store_of(
            Source::Predicted,
            4,
            vec![
                obs(1, 10, 0.0, Source::Predicted),
                obs(2, 10, 0.0, Source::Predicted),
                obs(4, 10, 0.0, Source::Predicted),
            ],
        );

        let (counts, coverage) = evaluator().evaluate_pair(&gt, &pred).unwrap();

        assert_eq!(counts.true_positives, 3);
        assert_eq!(counts.false_negatives, 1);
        assert_eq!(counts.id_switches, 0);
        assert_eq!(coverage.fragmentations, 1);
        // Coverage 3/4 falls between the mostly-tracked and mostly-lost
        // cutoffs.
        assert_eq!(coverage.partially_tracked, 1);
    }

    #[test]
    fn test_spurious_prediction_counts_false_positive() {
        let gt = store_of(
            Source::GroundTruth,
            2,
            (1..=2).map(|f| obs(f, 5, 0.0, Source::GroundTruth)).collect(),
        );
        let pred = store_of(
            Source::Predicted,
            2,
            vec![
                obs(1, 10, 0.0, Source::Predicted),
                obs(1, 99, 500.0, Source::Predicted),
                obs(2, 10, 0.0, Source::Predicted),
            ],
        );

        let (counts, _) = evaluator().evaluate_pair(&gt, &pred).unwrap();

        assert_eq!(counts.true_positives, 2);
        assert_eq!(counts.false_positives, 1);
        assert_eq!(counts.false_negatives, 0);

        let metrics = counts.summarize();
        assert_relative_eq!(metrics.precision, 2.0 / 3.0);
        assert_relative_eq!(metrics.recall, 1.0);
    }

    #[test]
    fn test_empty_stores_produce_zeroed_metrics() {
        let gt = store_of(Source::GroundTruth, 3, vec![]);
        let pred = store_of(Source::Predicted, 3, vec![]);

        let (counts, coverage) = evaluator().evaluate_pair(&gt, &pred).unwrap();

        assert_eq!(counts.frames, 3);
        assert_eq!(counts.gt_total, 0);
        assert_relative_eq!(counts.summarize().mota, 0.0);
        assert_eq!(coverage.mostly_lost, 0);
    }

    #[test]
    fn test_stores_of_different_lengths() {
        let gt = store_of(
            Source::GroundTruth,
            2,
            (1..=2).map(|f| obs(f, 5, 0.0, Source::GroundTruth)).collect(),
        );
        let pred = store_of(
            Source::Predicted,
            5,
            vec![obs(5, 10, 500.0, Source::Predicted)],
        );

        let (counts, _) = evaluator().evaluate_pair(&gt, &pred).unwrap();

        // All five frames are visited.
        assert_eq!(counts.frames, 5);
        assert_eq!(counts.false_negatives, 2);
        assert_eq!(counts.false_positives, 1);
    }

    // ===== Assignment verification =====

    #[test]
    fn test_verify_rejects_foreign_identity() {
        let gt = vec![obs(1, 5, 0.0, Source::GroundTruth)];
        let pred = vec![obs(1, 10, 0.0, Source::Predicted)];

        let assignment = FrameAssignment {
            matches: vec![MatchedPair {
                gt_id: 5,
                pred_id: 77,
                iou: 1.0,
            }],
            unmatched_gt: vec![],
            unmatched_pred: vec![],
        };

        let err = verify_assignment(1, &assignment, &gt, &pred).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(err.to_string().contains("identity 77"));
    }

    #[test]
    fn test_verify_rejects_double_match() {
        let gt = vec![
            obs(1, 5, 0.0, Source::GroundTruth),
            obs(1, 6, 20.0, Source::GroundTruth),
        ];
        let pred = vec![obs(1, 10, 0.0, Source::Predicted)];

        let assignment = FrameAssignment {
            matches: vec![
                MatchedPair {
                    gt_id: 5,
                    pred_id: 10,
                    iou: 1.0,
                },
                MatchedPair {
                    gt_id: 6,
                    pred_id: 10,
                    iou: 0.8,
                },
            ],
            unmatched_gt: vec![],
            unmatched_pred: vec![],
        };

        let err = verify_assignment(1, &assignment, &gt, &pred).unwrap_err();
        assert!(err.to_string().contains("matched more than once"));
    }

    #[test]
    fn test_verify_accepts_valid_assignment() {
        let gt = vec![obs(1, 5, 0.0, Source::GroundTruth)];
        let pred = vec![
            obs(1, 10, 0.0, Source::Predicted),
            obs(1, 11, 500.0, Source::Predicted),
        ];

        let assignment = match_frame(&gt, &pred, 0.5);
        assert!(verify_assignment(1, &assignment, &gt, &pred).is_ok());
    }
}
