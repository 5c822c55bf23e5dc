use crate::error::CaptureError;
use crate::frame::{FrameEncoding, FrameSource, RawFrame};

/// Synthetic camera: a bright square sliding over a dark gradient.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        self.frame_count += 1;
        let (w, h) = (self.width as usize, self.height as usize);
        let side = w.min(h) * 3 / 10;
        let ox = (self.frame_count as usize * 12) % (w.saturating_sub(side)).max(1);
        let oy = (self.frame_count as usize * 9) % (h.saturating_sub(side)).max(1);

        let mut pixels = vec![0u8; w * h * 3];
        for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
            let (x, y) = (i % w, i / w);
            let inside = x >= ox && x < ox + side && y >= oy && y < oy + side;
            if inside {
                px.copy_from_slice(&[240, 240, 240]);
            } else {
                let shade = ((x + y) % 64) as u8;
                px.copy_from_slice(&[shade, shade / 2, 32]);
            }
        }
        RawFrame::new(pixels, self.width, self.height)
    }
}

impl FrameSource for SyntheticSource {
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        self.next_frame()?.encode(encoding)
    }
}
