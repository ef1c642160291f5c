//! MOT-format trajectory file writer.

use crate::observation::Observation;
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes observations as MOT records, one per line:
/// `frame,id,bb_left,bb_top,bb_width,bb_height,conf,class,visibility`.
///
/// Box geometry, confidence and visibility are written with two decimal
/// places. Records written back through [`crate::TrackStore::load`]
/// parse to the same observations.
#[derive(Debug)]
pub struct TrackWriter {
    writer: BufWriter<File>,
}

impl TrackWriter {
    /// Create the output file, truncating any existing content.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create '{}': {}", path.display(), e),
            ))
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one observation as a MOT record.
    pub fn write(&mut self, obs: &Observation) -> Result<()> {
        writeln!(
            self.writer,
            "{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{},{:.2}",
            obs.frame,
            obs.identity,
            obs.bbox.left,
            obs.bbox.top,
            obs.bbox.width,
            obs.bbox.height,
            obs.confidence,
            obs.class_id,
            obs.visibility,
        )?;
        Ok(())
    }

    /// Append every observation in iteration order.
    pub fn write_all<'a, I>(&mut self, observations: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        for obs in observations {
            self.write(obs)?;
        }
        Ok(())
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for TrackWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
