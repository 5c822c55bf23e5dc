//! Live frame capture and encoding.
//!
//! - `RawFrame`: decoded RGB8 pixels plus dimensions.
//! - `FrameSource`: anything that can produce an encoded snapshot of the current frame.
//! - `FrameSlot`: single-slot hand-off between a capture thread and the pump.
//!
//! Sources never queue frames. A capture always encodes the newest frame the
//! source knows about, so the detector never sees a stale image when a fresher
//! one exists.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::CaptureError;

/// Quality used for stream-mode frames.
pub const STREAM_JPEG_QUALITY: u8 = 60;
/// Quality used for one-shot request frames.
pub const REQUEST_JPEG_QUALITY: u8 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "frame.jpg",
            ImageMime::Png => "frame.png",
        }
    }
}

/// How a captured frame is encoded before it goes over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEncoding {
    pub mime: ImageMime,
    /// 1..=100, ignored for PNG.
    pub quality: u8,
}

impl FrameEncoding {
    pub fn jpeg(quality: u8) -> Self {
        Self {
            mime: ImageMime::Jpeg,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn png() -> Self {
        Self {
            mime: ImageMime::Png,
            quality: 100,
        }
    }

    pub fn stream_default() -> Self {
        Self::jpeg(STREAM_JPEG_QUALITY)
    }

    pub fn request_default() -> Self {
        Self::jpeg(REQUEST_JPEG_QUALITY)
    }
}

/// Decoded RGB8 frame.
#[derive(Clone, Debug)]
pub struct RawFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    captured_at: Instant,
}

impl RawFrame {
    /// Wrap packed RGB8 pixels. Fails if the buffer length does not match.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CaptureError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| CaptureError::Encode("frame dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(CaptureError::Encode(format!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            captured_at: Instant::now(),
        })
    }

    pub fn has_usable_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Encode the frame. Frames without usable dimensions are `Unavailable`.
    pub fn encode(&self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        if !self.has_usable_dimensions() {
            return Err(CaptureError::Unavailable);
        }
        let mut out = Cursor::new(Vec::with_capacity(self.data.len() / 8));
        let result = match encoding.mime {
            ImageMime::Jpeg => JpegEncoder::new_with_quality(&mut out, encoding.quality)
                .write_image(&self.data, self.width, self.height, ExtendedColorType::Rgb8),
            ImageMime::Png => PngEncoder::new(&mut out).write_image(
                &self.data,
                self.width,
                self.height,
                ExtendedColorType::Rgb8,
            ),
        };
        result.map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// A live video feed that can snapshot its current frame.
pub trait FrameSource {
    /// Encode the most recent frame.
    ///
    /// Returns `CaptureError::Unavailable` when there is no active video with
    /// usable dimensions.
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        (**self).capture(encoding)
    }
}

/// Latest-frame slot shared between a capture thread and the pump.
///
/// `publish` overwrites whatever was there; nothing is queued.
#[derive(Clone, Default)]
pub struct FrameSlot {
    latest: Arc<Mutex<Option<RawFrame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: RawFrame) {
        if let Ok(mut guard) = self.latest.lock() {
            *guard = Some(frame);
        } else {
            log::warn!("frame slot lock poisoned; dropping frame");
        }
    }

    /// Forget the current frame (camera stopped).
    pub fn clear(&self) {
        if let Ok(mut guard) = self.latest.lock() {
            *guard = None;
        }
    }
}

impl FrameSource for FrameSlot {
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        let guard = self
            .latest
            .lock()
            .map_err(|_| CaptureError::Encode("frame slot lock poisoned".into()))?;
        match guard.as_ref() {
            Some(frame) => frame.encode(encoding),
            None => Err(CaptureError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> RawFrame {
        RawFrame::new(vec![value; (width * height * 3) as usize], width, height).unwrap()
    }

    #[test]
    fn raw_frame_rejects_wrong_length() {
        assert!(RawFrame::new(vec![0; 10], 4, 4).is_err());
    }

    #[test]
    fn empty_slot_is_unavailable() {
        let mut slot = FrameSlot::new();
        let err = slot.capture(&FrameEncoding::stream_default()).unwrap_err();
        assert!(matches!(err, CaptureError::Unavailable));
    }

    #[test]
    fn zero_sized_frame_is_unavailable() {
        let mut slot = FrameSlot::new();
        slot.publish(RawFrame::new(Vec::new(), 0, 0).unwrap());
        let err = slot.capture(&FrameEncoding::stream_default()).unwrap_err();
        assert!(matches!(err, CaptureError::Unavailable));
    }

    #[test]
    fn slot_encodes_the_newest_frame() {
        let mut slot = FrameSlot::new();
        slot.publish(solid(4, 4, 10));
        slot.publish(solid(8, 6, 200));
        let png = slot.capture(&FrameEncoding::png()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0).0, [200, 200, 200]);
    }

    #[test]
    fn jpeg_output_has_soi_marker() {
        let jpeg = solid(16, 16, 128)
            .encode(&FrameEncoding::jpeg(60))
            .unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn cleared_slot_is_unavailable_again() {
        let mut slot = FrameSlot::new();
        slot.publish(solid(2, 2, 1));
        slot.clear();
        assert!(slot.capture(&FrameEncoding::png()).is_err());
    }
}
