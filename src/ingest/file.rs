//! Still image file source.
//!
//! The file is read and decoded on every capture so an external process can
//! keep overwriting it with the latest camera still. A missing or half-written
//! file is reported as `Unavailable`, which the pump treats as transient.

use std::path::PathBuf;

use crate::error::CaptureError;
use crate::frame::{FrameEncoding, FrameSource, RawFrame};

pub struct FileSource {
    path: PathBuf,
    frame_count: u64,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame_count: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn read_frame(&self) -> Result<RawFrame, CaptureError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            log::debug!("image file {} unreadable: {}", self.path.display(), e);
            CaptureError::Unavailable
        })?;
        let image = image::load_from_memory(&bytes).map_err(|e| {
            log::debug!("image file {} not decodable: {}", self.path.display(), e);
            CaptureError::Unavailable
        })?;
        let rgb = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        RawFrame::new(rgb.into_raw(), width, height)
    }
}

impl FrameSource for FileSource {
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        let encoded = self.read_frame()?.encode(encoding)?;
        self.frame_count += 1;
        Ok(encoded)
    }
}
