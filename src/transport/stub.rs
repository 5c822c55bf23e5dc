//! In-process stand-in for the detector.
//!
//! Reports one square "object" per frame that drifts across the image, so the
//! overlay pipeline can be exercised without a detector service.

use std::collections::VecDeque;
use std::time::Instant;

use serde_json::json;

use super::wire::decode_response;
use super::{ChannelEvent, RequestTransport, StreamChannel, StreamTransport};
use crate::detect::{InferenceParameters, InferenceResponse};
use crate::error::TransportError;
use crate::frame::ImageMime;

const STUB_LABEL: &str = "object";
const STUB_SCORE: f32 = 0.9;
const FALLBACK_SIZE: (u32, u32) = (640, 480);

pub struct StubDetector {
    name: String,
}

impl StubDetector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn health(&self) -> serde_json::Value {
        json!({ "status": "ok", "engine": "stub", "name": self.name })
    }
}

/// Build one JSON message the way the detector service would.
fn respond(frame_index: u64, image: &[u8], params: &InferenceParameters) -> Vec<u8> {
    let started = Instant::now();
    let (width, height) = image::load_from_memory(image)
        .map(|img| (img.width(), img.height()))
        .unwrap_or(FALLBACK_SIZE);
    let size = width.min(height) as f32 * 0.3;
    let x = (frame_index as f32 * 12.0) % (width as f32 - size).max(1.0);
    let y = (frame_index as f32 * 9.0) % (height as f32 - size).max(1.0);

    let mut detections = Vec::new();
    if STUB_SCORE >= params.confidence && params.allows_label(STUB_LABEL) && params.max_results > 0
    {
        let area_ratio = (size * size) / (width as f32 * height as f32).max(1.0);
        if params.min_area_ratio.map_or(true, |min| area_ratio >= min) {
            detections.push(json!({
                "label": STUB_LABEL,
                "class_id": 0,
                "score": STUB_SCORE,
                "bbox": [x, y, size, size],
            }));
        }
    }
    let time_ms = started.elapsed().as_secs_f64() * 1000.0;
    json!({ "time_ms": time_ms, "detections": detections })
        .to_string()
        .into_bytes()
}

impl RequestTransport for StubDetector {
    fn infer(
        &self,
        image: &[u8],
        _mime: ImageMime,
        params: &InferenceParameters,
    ) -> Result<InferenceResponse, TransportError> {
        decode_response(&respond(0, image, params))
    }
}

impl StreamTransport for StubDetector {
    type Channel = StubChannel;

    fn open(&self, params: &InferenceParameters) -> Result<StubChannel, TransportError> {
        log::info!("stream channel open: stub://{}", self.name);
        Ok(StubChannel {
            params: params.clone(),
            pending: VecDeque::new(),
            frames: 0,
            closed: false,
        })
    }
}

/// Stream channel of the stub detector. Answers every frame, in order.
pub struct StubChannel {
    params: InferenceParameters,
    pending: VecDeque<Vec<u8>>,
    frames: u64,
    closed: bool,
}

impl StreamChannel for StubChannel {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Network("stream channel closed".into()));
        }
        self.frames += 1;
        self.pending
            .push_back(respond(self.frames, &frame, &self.params));
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<ChannelEvent>, TransportError> {
        if self.closed {
            return Ok(Some(ChannelEvent::Closed));
        }
        Ok(self.pending.pop_front().map(ChannelEvent::Message))
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}
