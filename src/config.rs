//! Run configuration for the evaluation engine.
//!
//! A run is described by an [`EvalConfig`] (matcher settings shared by
//! every sequence) and a list of [`SequenceSpec`]s (one per sequence to
//! score). Both can be built in code or loaded together from a JSON
//! file via [`RunConfig::from_file`].

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// IoU threshold used when none is configured.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

fn default_iou_threshold() -> f64 {
    DEFAULT_IOU_THRESHOLD
}

fn default_classes() -> Vec<u32> {
    vec![0, 1, 2, 3]
}

/// Matcher and driver settings shared by all sequences of a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// Minimum IoU for a candidate match (inclusive). Must lie in (0, 1].
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
    /// Recognized class labels. Records with any other label are
    /// treated as malformed and skipped at load time.
    #[serde(default = "default_classes")]
    pub classes: Vec<u32>,
    /// Evaluate sequences on a thread pool instead of one at a time.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            iou_threshold: default_iou_threshold(),
            classes: default_classes(),
            parallel: false,
        }
    }
}

impl EvalConfig {
    /// Check the configuration for values the engine cannot run with.
    ///
    /// # Returns
    /// `Ok(())` if the configuration is usable, `Error::Config` otherwise.
    pub fn validate(&self) -> Result<()> {
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "iou_threshold must lie in (0, 1], got {}",
                self.iou_threshold
            )));
        }
        if self.classes.is_empty() {
            return Err(Error::Config(
                "the recognized class set is empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for &class_id in &self.classes {
            if !seen.insert(class_id) {
                return Err(Error::Config(format!(
                    "class {} listed more than once",
                    class_id
                )));
            }
        }
        Ok(())
    }
}

/// Description of one sequence to evaluate.
///
/// The frame count comes from `seq_length` when set, otherwise from the
/// `seqinfo` file; configuring neither is an error at evaluation time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceSpec {
    /// Name used in logs and the report.
    pub name: String,
    /// Ground-truth trajectory file.
    pub gt_path: PathBuf,
    /// Predicted trajectory file.
    pub pred_path: PathBuf,
    /// Expected frame count. Takes precedence over `seqinfo`.
    #[serde(default)]
    pub seq_length: Option<u32>,
    /// Sequence info file supplying the frame count.
    #[serde(default)]
    pub seqinfo: Option<PathBuf>,
    /// Shift subtracted from raw frame numbers before the window check.
    #[serde(default)]
    pub frame_offset: i64,
}

impl SequenceSpec {
    /// Create a spec with no frame count configured yet.
    pub fn new<S, G, P>(name: S, gt_path: G, pred_path: P) -> Self
    where
        S: Into<String>,
        G: Into<PathBuf>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            gt_path: gt_path.into(),
            pred_path: pred_path.into(),
            seq_length: None,
            seqinfo: None,
            frame_offset: 0,
        }
    }
}

/// A full evaluation run: shared settings plus the sequence list.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Matcher settings. Defaults apply when the section is absent.
    #[serde(default)]
    pub evaluation: EvalConfig,
    /// Sequences to evaluate, reported in this order.
    pub sequences: Vec<SequenceSpec>,
}

impl RunConfig {
    /// Load a run configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON configuration file
    ///
    /// # Returns
    /// The parsed configuration, or `Error::Config` if the file cannot
    /// be read or does not parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let config: RunConfig = serde_json::from_str(&data).map_err(|e| {
            Error::Config(format!("invalid run configuration '{}': {}", path.display(), e))
        })?;
        Ok(config)
    }
}
