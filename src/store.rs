//! Frame-indexed trajectory storage and MOT record parsing.

use crate::observation::{BoundingBox, Observation, Source};
use crate::{Error, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of fields a MOT record must carry.
const RECORD_FIELDS: usize = 9;

/// Evaluation window of a sequence.
///
/// Raw MOT frame numbers are shifted down by `offset` and kept when the
/// result falls inside `[1, length]`. Sequences annotated mid-video carry
/// a non-zero offset; everything outside the window is dropped.
#[derive(Debug, Clone, Copy)]
pub struct FrameWindow {
    length: u32,
    offset: i64,
}

impl FrameWindow {
    pub fn new(length: u32, offset: i64) -> Result<Self> {
        if length == 0 {
            return Err(Error::Config(
                "sequence length must be at least 1".to_string(),
            ));
        }
        Ok(Self { length, offset })
    }

    /// Number of frames in the window.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Frame shift applied before the bounds check.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Map a raw frame number into the window.
    ///
    /// Returns `None` when the shifted frame falls outside `[1, length]`.
    pub fn remap(&self, raw_frame: i64) -> Option<u32> {
        let shifted = raw_frame - self.offset;
        if shifted >= 1 && shifted <= self.length as i64 {
            Some(shifted as u32)
        } else {
            None
        }
    }
}

/// One parsed MOT record, before window remapping.
#[derive(Debug, Clone)]
struct MotRecord {
    frame: i64,
    identity: i64,
    bbox: BoundingBox,
    confidence: f64,
    class_id: u32,
    visibility: f64,
}

fn parse_field<T: std::str::FromStr>(parts: &[&str], idx: usize, name: &str, line: usize) -> Result<T> {
    parts[idx].trim().parse().map_err(|_| Error::Parse {
        line,
        reason: format!("field '{}' is not numeric: '{}'", name, parts[idx].trim()),
    })
}

/// Parse one line of a MOT-format file.
///
/// Format: `frame,id,bb_left,bb_top,bb_width,bb_height,conf,class,visibility`.
/// Surplus trailing fields are ignored.
fn parse_record(line_number: usize, text: &str, classes: &[u32]) -> Result<MotRecord> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() < RECORD_FIELDS {
        return Err(Error::Parse {
            line: line_number,
            reason: format!("expected {} fields, got {}", RECORD_FIELDS, parts.len()),
        });
    }

    let frame: i64 = parse_field(&parts, 0, "frame", line_number)?;
    let identity: i64 = parse_field(&parts, 1, "identity", line_number)?;
    let left: f64 = parse_field(&parts, 2, "bb_left", line_number)?;
    let top: f64 = parse_field(&parts, 3, "bb_top", line_number)?;
    let width: f64 = parse_field(&parts, 4, "bb_width", line_number)?;
    let height: f64 = parse_field(&parts, 5, "bb_height", line_number)?;
    let confidence: f64 = parse_field(&parts, 6, "conf", line_number)?;
    let class_id: u32 = parse_field(&parts, 7, "class", line_number)?;
    let visibility: f64 = parse_field(&parts, 8, "visibility", line_number)?;

    if frame < 1 {
        return Err(Error::Parse {
            line: line_number,
            reason: format!("frame numbers are 1-based, got {}", frame),
        });
    }
    if !(width > 0.0 && height > 0.0) || left < 0.0 || top < 0.0 {
        return Err(Error::Parse {
            line: line_number,
            reason: format!(
                "degenerate box [{}, {}, {}, {}]",
                left, top, width, height
            ),
        });
    }
    if !classes.contains(&class_id) {
        return Err(Error::Parse {
            line: line_number,
            reason: format!("class {} is not in the recognized set {:?}", class_id, classes),
        });
    }

    Ok(MotRecord {
        frame,
        identity,
        bbox: BoundingBox::new(left, top, width, height),
        confidence,
        class_id,
        visibility,
    })
}

/// Frame-indexed observations of a single source over one sequence.
///
/// Storage is fixed-length: one bucket per frame of the evaluation window,
/// so per-frame lookup is O(1) and frames without observations read as
/// empty. A frame with no observations is a normal state, not an error.
#[derive(Debug, Clone)]
pub struct TrackStore {
    source: Source,
    window: FrameWindow,
    frames: Vec<Vec<Observation>>,
    total_observations: u64,
    skipped_records: u64,
    outside_window: u64,
}

impl TrackStore {
    /// Load a MOT-format trajectory file.
    ///
    /// Malformed records (too few fields, non-numeric values, a class
    /// outside `classes`, a degenerate box) are skipped with a warning and
    /// counted. A duplicate identity within one frame aborts the load with
    /// an invariant violation.
    ///
    /// # Arguments
    /// * `path` - Path to the trajectory file
    /// * `source` - Which side of the evaluation the file belongs to
    /// * `window` - Evaluation window applied to raw frame numbers
    /// * `classes` - The recognized class labels
    pub fn load<P: AsRef<Path>>(
        path: P,
        source: Source,
        window: FrameWindow,
        classes: &[u32],
    ) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::MissingSequence {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let reader = BufReader::new(file);
        let mut store = Self::empty(source, window);

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(index + 1, &line, classes) {
                Ok(record) => store.place(record, &display)?,
                Err(err) => {
                    store.skipped_records += 1;
                    warn!("{}: {} (skipped)", display, err);
                }
            }
        }

        if store.skipped_records > 0 {
            warn!(
                "{}: {} malformed record(s) skipped",
                display, store.skipped_records
            );
        }
        if store.outside_window > 0 {
            debug!(
                "{}: {} record(s) outside the evaluation window",
                display, store.outside_window
            );
        }

        Ok(store)
    }

    /// Build a store from already-parsed observations.
    ///
    /// Observation frames are taken as raw frame numbers and go through the
    /// same window placement and duplicate-identity checking as `load`.
    pub fn from_observations(
        source: Source,
        window: FrameWindow,
        observations: Vec<Observation>,
    ) -> Result<Self> {
        let mut store = Self::empty(source, window);
        for obs in observations {
            let record = MotRecord {
                frame: obs.frame as i64,
                identity: obs.identity,
                bbox: obs.bbox,
                confidence: obs.confidence,
                class_id: obs.class_id,
                visibility: obs.visibility,
            };
            store.place(record, "<memory>")?;
        }
        Ok(store)
    }

    fn empty(source: Source, window: FrameWindow) -> Self {
        Self {
            source,
            window,
            frames: vec![Vec::new(); window.length() as usize],
            total_observations: 0,
            skipped_records: 0,
            outside_window: 0,
        }
    }

    fn place(&mut self, record: MotRecord, origin: &str) -> Result<()> {
        let frame = match self.window.remap(record.frame) {
            Some(frame) => frame,
            None => {
                self.outside_window += 1;
                return Ok(());
            }
        };

        let bucket = &mut self.frames[(frame - 1) as usize];
        if bucket.iter().any(|obs| obs.identity == record.identity) {
            return Err(Error::InvariantViolation(format!(
                "{}: duplicate identity {} in {} frame {}",
                origin, record.identity, self.source, frame
            )));
        }

        bucket.push(Observation {
            frame,
            identity: record.identity,
            bbox: record.bbox,
            class_id: record.class_id,
            confidence: record.confidence,
            visibility: record.visibility,
            source: self.source,
        });
        self.total_observations += 1;
        Ok(())
    }

    /// Observations recorded for a frame (1-based).
    ///
    /// Frames without observations, including frames outside the window,
    /// read as an empty slice; this never fails.
    pub fn observations_at(&self, frame: u32) -> &[Observation] {
        if frame == 0 {
            return &[];
        }
        self.frames
            .get((frame - 1) as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Which side of the evaluation this store holds.
    pub fn source(&self) -> Source {
        self.source
    }

    /// The evaluation window the store was built with.
    pub fn window(&self) -> FrameWindow {
        self.window
    }

    /// Number of frames in the window.
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Observations kept after window placement.
    pub fn total_observations(&self) -> u64 {
        self.total_observations
    }

    /// Malformed records dropped during `load`.
    pub fn skipped_records(&self) -> u64 {
        self.skipped_records
    }

    /// Well-formed records dropped because they fell outside the window.
    pub fn outside_window(&self) -> u64 {
        self.outside_window
    }
}
