//! Cross-frame identity bookkeeping: switch detection and track coverage.

use crate::matching::FrameAssignment;
use serde::Serialize;
use std::collections::HashMap;

/// Coverage ratio at or above which an identity counts as mostly tracked.
const MOSTLY_TRACKED_RATIO: f64 = 0.8;
/// Coverage ratio below which an identity counts as mostly lost.
const MOSTLY_LOST_RATIO: f64 = 0.2;

/// Continuity record of one ground-truth identity.
///
/// Counts the frames in which the identity appears and the subset in which
/// it was matched. A match that follows a miss is a fragmentation.
#[derive(Debug, Clone, Default)]
pub struct TrackCoverage {
    present_frames: u32,
    matched_frames: u32,
    fragmentations: u32,
    matched_last: bool,
}

impl TrackCoverage {
    fn record_matched(&mut self) {
        self.present_frames += 1;
        self.matched_frames += 1;
        if self.present_frames > 1 && !self.matched_last {
            self.fragmentations += 1;
        }
        self.matched_last = true;
    }

    fn record_missed(&mut self) {
        self.present_frames += 1;
        self.matched_last = false;
    }

    /// Fraction of the identity's frames in which it was matched.
    pub fn ratio(&self) -> f64 {
        if self.present_frames == 0 {
            0.0
        } else {
            self.matched_frames as f64 / self.present_frames as f64
        }
    }

    /// Number of miss-to-match transitions seen so far.
    pub fn fragmentations(&self) -> u32 {
        self.fragmentations
    }
}

/// Coverage summary over all ground-truth identities of a sequence.
///
/// An identity is mostly tracked when matched in at least 80% of its
/// frames and mostly lost below 20%; everything between is partial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageStats {
    pub mostly_tracked: u64,
    pub partially_tracked: u64,
    pub mostly_lost: u64,
    pub fragmentations: u64,
}

impl CoverageStats {
    /// Add another sequence's stats into this one.
    pub fn merge(&mut self, other: &CoverageStats) {
        self.mostly_tracked += other.mostly_tracked;
        self.partially_tracked += other.partially_tracked;
        self.mostly_lost += other.mostly_lost;
        self.fragmentations += other.fragmentations;
    }
}

/// Tracks the ground-truth to prediction identity mapping across frames.
///
/// Holds only the most recent frame's mapping: every frame the mapping is
/// rebuilt from that frame's matches and replaces the previous one. A
/// ground-truth identity that skips a frame therefore drops out of the
/// mapping and counts as new when it reappears; only frame-to-frame
/// reassignments register as switches.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    current: HashMap<i64, i64>,
    switches: u64,
    coverage: HashMap<i64, TrackCoverage>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame's assignment into the tracker.
    ///
    /// Returns the number of identity switches this frame contributed: a
    /// ground-truth identity matched to one prediction in the previous
    /// frame and to a different one now.
    pub fn observe_frame(&mut self, assignment: &FrameAssignment) -> u64 {
        let mut next = HashMap::with_capacity(assignment.matches.len());
        let mut switches = 0;

        for pair in &assignment.matches {
            if let Some(&previous) = self.current.get(&pair.gt_id) {
                if previous != pair.pred_id {
                    switches += 1;
                }
            }
            next.insert(pair.gt_id, pair.pred_id);

            self.coverage.entry(pair.gt_id).or_default().record_matched();
        }

        for &gt_id in &assignment.unmatched_gt {
            self.coverage.entry(gt_id).or_default().record_missed();
        }

        // Replace wholesale, never merge: identities absent this frame
        // lose their mapping.
        self.current = next;
        self.switches += switches;
        switches
    }

    /// Total switches observed so far.
    pub fn switches(&self) -> u64 {
        self.switches
    }

    /// The most recent frame's ground-truth to prediction mapping.
    pub fn mapping(&self) -> &HashMap<i64, i64> {
        &self.current
    }

    /// Summarize per-identity coverage into sequence-level stats.
    pub fn coverage_stats(&self) -> CoverageStats {
        let mut stats = CoverageStats::default();
        for coverage in self.coverage.values() {
            stats.fragmentations += coverage.fragmentations as u64;

            let ratio = coverage.ratio();
            if ratio >= MOSTLY_TRACKED_RATIO {
                stats.mostly_tracked += 1;
            } else if ratio < MOSTLY_LOST_RATIO {
                stats.mostly_lost += 1;
            } else {
                stats.partially_tracked += 1;
            }
        }
        stats
    }
}
