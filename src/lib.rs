//! # MOTEval - Multi-Object Tracking Evaluation
//!
//! Scores a tracker's predicted trajectories against ground truth over
//! MOT-format trajectory files.
//!
//! ## Features
//!
//! - Greedy IoU matching with per-class candidate restriction
//! - CLEAR metrics (MOTA, MOTP) plus precision, recall and IDF1
//! - Identity-switch and track-coverage bookkeeping (MT/PT/ML, fragmentations)
//! - Trajectory file loading with per-record error recovery
//! - Multi-sequence runs aggregated from pooled counters
//!
//! ## Example
//!
//! ```rust,ignore
//! use moteval_rs::{EvalConfig, Evaluator, SequenceSpec};
//!
//! let evaluator = Evaluator::new(EvalConfig::default()).unwrap();
//!
//! let mut sequence = SequenceSpec::new("S1", "data/S1/gt.txt", "out/S1/pred.txt");
//! sequence.seq_length = Some(180);
//!
//! let report = evaluator.evaluate(&[sequence]).unwrap();
//! println!("{}", report);
//! ```

// Public modules
pub mod observation;
pub mod store;
pub mod seqinfo;
pub mod matching;
pub mod identity;
pub mod accumulator;
pub mod config;
pub mod evaluation;
pub mod report;
pub mod writer;

// Re-exports for convenience
pub use accumulator::{EvalCounts, MetricsSummary};
pub use config::{EvalConfig, RunConfig, SequenceSpec, DEFAULT_IOU_THRESHOLD};
pub use evaluation::Evaluator;
pub use identity::{CoverageStats, IdentityTracker, TrackCoverage};
pub use matching::{iou_matrix, match_frame, FrameAssignment, MatchedPair};
pub use observation::{BoundingBox, Observation, Source};
pub use report::{EvalReport, SequenceResult, SkippedSequence};
pub use seqinfo::SequenceInfo;
pub use store::{FrameWindow, TrackStore};
pub use writer::TrackWriter;

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur during evaluation
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        Config(String),

        #[error("Malformed record on line {line}: {reason}")]
        Parse { line: usize, reason: String },

        #[error("Sequence input '{path}' unavailable: {message}")]
        MissingSequence { path: String, message: String },

        #[error("Sequence info file '{path}': {message}")]
        SequenceInfo { path: String, message: String },

        #[error("Invariant violation: {0}")]
        InvariantViolation(String),

        #[error("All {0} configured sequence(s) failed")]
        AllSequencesFailed(usize),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }

    impl Error {
        /// Whether the error is confined to a single sequence.
        ///
        /// Such failures skip the sequence and let the rest of the run
        /// continue; anything else aborts the run.
        pub fn is_sequence_failure(&self) -> bool {
            matches!(
                self,
                Error::MissingSequence { .. } | Error::SequenceInfo { .. } | Error::Io(_)
            )
        }
    }

    /// Result type for evaluation operations
    pub type Result<T> = std::result::Result<T, Error>;
}
