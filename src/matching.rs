//! Per-frame spatial matching between ground truth and predictions.

use crate::observation::Observation;
use nalgebra::DMatrix;

/// A committed ground-truth to prediction match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    pub gt_id: i64,
    pub pred_id: i64,
    pub iou: f64,
}

/// Outcome of matching one frame.
///
/// Unmatched ground truth are the frame's false negatives; unmatched
/// predictions are its false positives.
#[derive(Debug, Clone, Default)]
pub struct FrameAssignment {
    pub matches: Vec<MatchedPair>,
    pub unmatched_gt: Vec<i64>,
    pub unmatched_pred: Vec<i64>,
}

impl FrameAssignment {
    /// Sum of IoU over the committed matches.
    pub fn iou_total(&self) -> f64 {
        self.matches.iter().map(|m| m.iou).sum()
    }
}

/// Compute the pairwise IoU matrix between two observation lists.
///
/// Entry `(i, j)` is the IoU of `gt[i]` against `pred[j]`. Pure geometry;
/// class labels are not considered here.
pub fn iou_matrix(gt: &[Observation], pred: &[Observation]) -> DMatrix<f64> {
    let n = gt.len();
    let m = pred.len();

    if n == 0 || m == 0 {
        return DMatrix::zeros(n, m);
    }

    let mut result = DMatrix::zeros(n, m);
    for i in 0..n {
        for j in 0..m {
            result[(i, j)] = gt[i].bbox.iou(&pred[j].bbox);
        }
    }
    result
}

/// Match one frame's ground truth against its predictions.
///
/// Candidate pairs share a class and reach `iou_threshold`; they are
/// committed greedily in descending IoU order, each observation at most
/// once. The stable sort falls back to input order on ties, so the result
/// is deterministic. Pure function of its two input lists.
///
/// # Arguments
/// * `gt` - Ground-truth observations of one frame
/// * `pred` - Predicted observations of the same frame
/// * `iou_threshold` - Minimum IoU for a candidate pair
pub fn match_frame(gt: &[Observation], pred: &[Observation], iou_threshold: f64) -> FrameAssignment {
    if gt.is_empty() && pred.is_empty() {
        return FrameAssignment::default();
    }

    let ious = iou_matrix(gt, pred);

    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for i in 0..gt.len() {
        for j in 0..pred.len() {
            if gt[i].class_id != pred[j].class_id {
                continue;
            }
            let iou = ious[(i, j)];
            if iou >= iou_threshold {
                candidates.push((iou, i, j));
            }
        }
    }

    // Descending IoU; IoU values are finite so the comparator cannot see NaN.
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

    // Greedy commit with Vec<bool> used flags. This loop is the whole
    // assignment policy; an optimal solver could replace it without
    // changing the surrounding interface.
    let mut used_gt = vec![false; gt.len()];
    let mut used_pred = vec![false; pred.len()];
    let mut matches = Vec::new();

    for (iou, gt_idx, pred_idx) in candidates {
        if used_gt[gt_idx] || used_pred[pred_idx] {
            continue;
        }
        used_gt[gt_idx] = true;
        used_pred[pred_idx] = true;
        matches.push(MatchedPair {
            gt_id: gt[gt_idx].identity,
            pred_id: pred[pred_idx].identity,
            iou,
        });
    }

    let unmatched_gt = gt
        .iter()
        .zip(&used_gt)
        .filter(|(_, &used)| !used)
        .map(|(obs, _)| obs.identity)
        .collect();
    let unmatched_pred = pred
        .iter()
        .zip(&used_pred)
        .filter(|(_, &used)| !used)
        .map(|(obs, _)| obs.identity)
        .collect();

    FrameAssignment {
        matches,
        unmatched_gt,
        unmatched_pred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{BoundingBox, Source};
    use approx::assert_relative_eq;

    fn gt(identity: i64, class_id: u32, left: f64, top: f64, w: f64, h: f64) -> Observation {
        Observation::new(1, identity, BoundingBox::new(left, top, w, h), class_id, Source::GroundTruth)
    }

    fn pred(identity: i64, class_id: u32, left: f64, top: f64, w: f64, h: f64) -> Observation {
        Observation::new(1, identity, BoundingBox::new(left, top, w, h), class_id, Source::Predicted)
    }

    // ===== IoU Matrix =====

    #[test]
    fn test_iou_matrix_shape_and_values() {
        let gts = vec![gt(1, 0, 0.0, 0.0, 10.0, 10.0), gt(2, 0, 100.0, 100.0, 10.0, 10.0)];
        let preds = vec![pred(9, 0, 0.0, 0.0, 10.0, 10.0)];

        let m = iou_matrix(&gts, &preds);
        assert_eq!((m.nrows(), m.ncols()), (2, 1));
        assert_relative_eq!(m[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(m[(1, 0)], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_iou_matrix_empty() {
        let m = iou_matrix(&[], &[]);
        assert_eq!((m.nrows(), m.ncols()), (0, 0));
    }

    #[test]
    fn test_iou_matrix_ignores_class() {
        // Geometry only: a cross-class pair still gets its IoU
        let gts = vec![gt(1, 0, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 3, 0.0, 0.0, 10.0, 10.0)];
        let m = iou_matrix(&gts, &preds);
        assert_relative_eq!(m[(0, 0)], 1.0, epsilon = 1e-10);
    }

    // ===== Basic Matching =====

    #[test]
    fn test_match_identical_boxes() {
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 0, 0.0, 0.0, 10.0, 10.0)];

        let assignment = match_frame(&gts, &preds, 0.5);
        assert_eq!(assignment.matches.len(), 1);
        assert_eq!(assignment.matches[0].gt_id, 5);
        assert_eq!(assignment.matches[0].pred_id, 9);
        assert_relative_eq!(assignment.matches[0].iou, 1.0, epsilon = 1e-10);
        assert!(assignment.unmatched_gt.is_empty());
        assert!(assignment.unmatched_pred.is_empty());
    }

    #[test]
    fn test_match_below_threshold() {
        // IoU = 25/175 ≈ 0.143, below 0.5
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 0, 5.0, 5.0, 10.0, 10.0)];

        let assignment = match_frame(&gts, &preds, 0.5);
        assert!(assignment.matches.is_empty());
        assert_eq!(assignment.unmatched_gt, vec![5]);
        assert_eq!(assignment.unmatched_pred, vec![9]);
    }

    #[test]
    fn test_match_at_threshold_inclusive() {
        // Contained box: intersection 50, union 100, IoU exactly 0.5
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 0, 0.0, 0.0, 10.0, 5.0)];

        let assignment = match_frame(&gts, &preds, 0.5);
        assert_eq!(assignment.matches.len(), 1);
        assert_relative_eq!(assignment.matches[0].iou, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_match_empty_inputs() {
        let assignment = match_frame(&[], &[], 0.5);
        assert!(assignment.matches.is_empty());
        assert!(assignment.unmatched_gt.is_empty());
        assert!(assignment.unmatched_pred.is_empty());
    }

    #[test]
    fn test_match_only_predictions() {
        let preds = vec![pred(9, 0, 0.0, 0.0, 10.0, 10.0), pred(10, 1, 20.0, 0.0, 10.0, 10.0)];
        let assignment = match_frame(&[], &preds, 0.5);
        assert!(assignment.matches.is_empty());
        assert_eq!(assignment.unmatched_pred, vec![9, 10]);
    }

    #[test]
    fn test_match_only_ground_truth() {
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0)];
        let assignment = match_frame(&gts, &[], 0.5);
        assert_eq!(assignment.unmatched_gt, vec![5]);
        assert!(assignment.unmatched_pred.is_empty());
    }

    // ===== Class Restriction =====

    #[test]
    fn test_cross_class_never_matches() {
        // Same box, different classes: one FN plus one FP
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 1, 0.0, 0.0, 10.0, 10.0)];

        let assignment = match_frame(&gts, &preds, 0.5);
        assert!(assignment.matches.is_empty());
        assert_eq!(assignment.unmatched_gt, vec![5]);
        assert_eq!(assignment.unmatched_pred, vec![9]);
    }

    #[test]
    fn test_class_restriction_picks_same_class() {
        // A cross-class prediction overlaps better, but only the same-class
        // one is a candidate.
        let gts = vec![gt(5, 2, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![
            pred(8, 1, 0.0, 0.0, 10.0, 10.0),
            pred(9, 2, 0.0, 0.0, 10.0, 8.0),
        ];

        let assignment = match_frame(&gts, &preds, 0.5);
        assert_eq!(assignment.matches.len(), 1);
        assert_eq!(assignment.matches[0].pred_id, 9);
        assert_eq!(assignment.unmatched_pred, vec![8]);
    }

    // ===== Greedy Behavior =====

    #[test]
    fn test_greedy_commits_best_overlap_first() {
        // Both predictions reach the threshold for gt 5; the tighter one wins
        // and the other falls to gt 6.
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0), gt(6, 0, 2.0, 0.0, 10.0, 10.0)];
        let preds = vec![
            pred(9, 0, 1.0, 0.0, 10.0, 10.0),
            pred(10, 0, 0.0, 0.0, 10.0, 10.0),
        ];

        let assignment = match_frame(&gts, &preds, 0.3);
        assert_eq!(assignment.matches.len(), 2);

        // Highest IoU pair is (5, 10) at 1.0
        assert_eq!(assignment.matches[0].gt_id, 5);
        assert_eq!(assignment.matches[0].pred_id, 10);
        assert_eq!(assignment.matches[1].gt_id, 6);
        assert_eq!(assignment.matches[1].pred_id, 9);
    }

    #[test]
    fn test_one_to_one_constraint() {
        // Two ground truths over one prediction: only one match commits
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0), gt(6, 0, 1.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 0, 0.0, 0.0, 10.0, 10.0)];

        let assignment = match_frame(&gts, &preds, 0.3);
        assert_eq!(assignment.matches.len(), 1);
        assert_eq!(assignment.matches[0].gt_id, 5);
        assert_eq!(assignment.unmatched_gt, vec![6]);
    }

    #[test]
    fn test_partial_injection() {
        use std::collections::HashSet;

        let gts = vec![
            gt(1, 0, 0.0, 0.0, 10.0, 10.0),
            gt(2, 0, 8.0, 0.0, 10.0, 10.0),
            gt(3, 0, 16.0, 0.0, 10.0, 10.0),
        ];
        let preds = vec![
            pred(11, 0, 1.0, 0.0, 10.0, 10.0),
            pred(12, 0, 9.0, 0.0, 10.0, 10.0),
            pred(13, 0, 17.0, 0.0, 10.0, 10.0),
        ];

        let assignment = match_frame(&gts, &preds, 0.3);
        let gt_ids: HashSet<_> = assignment.matches.iter().map(|m| m.gt_id).collect();
        let pred_ids: HashSet<_> = assignment.matches.iter().map(|m| m.pred_id).collect();
        assert_eq!(gt_ids.len(), assignment.matches.len());
        assert_eq!(pred_ids.len(), assignment.matches.len());
    }

    #[test]
    fn test_deterministic_tie_break() {
        // Two equal-IoU candidates for the same prediction: input order wins
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0), gt(6, 0, 0.0, 0.0, 10.0, 10.0)];
        let preds = vec![pred(9, 0, 0.0, 0.0, 10.0, 10.0)];

        for _ in 0..10 {
            let assignment = match_frame(&gts, &preds, 0.5);
            assert_eq!(assignment.matches.len(), 1);
            assert_eq!(assignment.matches[0].gt_id, 5);
            assert_eq!(assignment.unmatched_gt, vec![6]);
        }
    }

    // ===== Assignment Bookkeeping =====

    #[test]
    fn test_iou_total() {
        let gts = vec![gt(5, 0, 0.0, 0.0, 10.0, 10.0), gt(6, 1, 50.0, 0.0, 10.0, 10.0)];
        let preds = vec![
            pred(9, 0, 0.0, 0.0, 10.0, 10.0),
            pred(10, 1, 50.0, 0.0, 10.0, 10.0),
        ];

        let assignment = match_frame(&gts, &preds, 0.5);
        assert_relative_eq!(assignment.iou_total(), 2.0, epsilon = 1e-10);
    }
}
