//! MOTChallenge seqinfo.ini sequence metadata.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Typed view of a MOTChallenge `seqinfo.ini` file.
///
/// These files describe a sequence:
/// ```ini
/// [Sequence]
/// name=RBK-AALESUND
/// imDir=img1
/// frameRate=25
/// seqLength=180
/// imWidth=1920
/// imHeight=1080
/// imExt=.jpg
/// ```
///
/// Only `seqLength` is required; everything else is optional metadata.
#[derive(Debug, Clone)]
pub struct SequenceInfo {
    pub name: Option<String>,
    pub seq_length: u32,
    pub frame_rate: Option<f64>,
    pub im_width: Option<u32>,
    pub im_height: Option<u32>,
}

impl SequenceInfo {
    /// Parse a `seqinfo.ini` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::SequenceInfo {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let mut values: HashMap<String, String> = HashMap::new();
        for line_result in BufReader::new(file).lines() {
            let line = line_result?;
            let line = line.trim();
            // Section headers and comments carry no key/value pairs
            if line.is_empty() || line.starts_with('[') || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(equal_idx) = line.find('=') {
                let key = line[..equal_idx].trim().to_string();
                let value = line[equal_idx + 1..].trim().to_string();
                values.insert(key, value);
            }
        }

        let seq_length = match values.get("seqLength") {
            Some(raw) => raw.parse().map_err(|_| Error::SequenceInfo {
                path: display.clone(),
                message: format!("seqLength is not a positive integer: '{}'", raw),
            })?,
            None => {
                return Err(Error::SequenceInfo {
                    path: display,
                    message: "missing required key 'seqLength'".to_string(),
                })
            }
        };
        if seq_length == 0 {
            return Err(Error::SequenceInfo {
                path: display,
                message: "seqLength must be at least 1".to_string(),
            });
        }

        Ok(Self {
            name: values.get("name").cloned(),
            seq_length,
            frame_rate: values.get("frameRate").and_then(|v| v.parse().ok()),
            im_width: values.get("imWidth").and_then(|v| v.parse().ok()),
            im_height: values.get("imHeight").and_then(|v| v.parse().ok()),
        })
    }
}
