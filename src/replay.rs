//! Recorded detector output fed back through the processor.
//!
//! A replay file is a JSON array of frames:
//!
//! ```json
//! [
//!   { "faces": [ { "boundingBox": { "left": 10, "top": 20, "right": 110, "bottom": 140 } } ] },
//!   { "error": "camera disconnected" }
//! ]
//! ```

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result};
use facemetrics_vision::{DetectedFace, FaceDetector};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
    /// A recorded detection failure; `faces` is ignored when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn parse_frames(raw: &str) -> Result<Vec<Frame>> {
    Ok(serde_json::from_str(raw)?)
}

pub fn load_frames(path: &Path) -> Result<Vec<Frame>> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_frames(&raw).with_context(|| format!("parsing replay {}", path.display()))
}

/// Detector that hands out recorded frames in order, ignoring the image.
#[derive(Debug, Default)]
pub struct ReplayDetector {
    frames: VecDeque<Frame>,
    closed: bool,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            closed: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FaceDetector for ReplayDetector {
    fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<DetectedFace>> {
        if self.closed {
            anyhow::bail!("replay has been closed");
        }
        let frame = self.frames.pop_front().context("replay exhausted")?;
        match frame.error {
            Some(e) => Err(anyhow::anyhow!(e)),
            None => Ok(frame.faces),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.frames.clear();
    }
}
