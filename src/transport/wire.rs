//! Detector response schema.
//!
//! Both modes return the same JSON shape:
//! `{ "detections": [{"label", "class_id", "score", "bbox": [x, y, w, h]}], "time_ms": f }`.
//! Stream messages may also carry a server timestamp `ts`, which is ignored.

use serde::Deserialize;

use crate::detect::{BBox, Detection, InferenceResponse, DEFAULT_LABEL};
use crate::error::TransportError;

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    detections: Vec<WireDetection>,
    #[serde(default)]
    time_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireDetection {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    class_id: i64,
    #[serde(default)]
    score: f32,
    bbox: Vec<f32>,
}

impl WireDetection {
    fn into_detection(self) -> Option<Detection> {
        let [x, y, w, h] = <[f32; 4]>::try_from(self.bbox.as_slice()).ok()?;
        let bbox = BBox::sanitized(x, y, w, h)?;
        let label = match self.label {
            Some(label) if !label.is_empty() => label,
            _ => DEFAULT_LABEL.to_string(),
        };
        Some(Detection::new(label, self.class_id, self.score, bbox))
    }
}

/// Decode one detector response.
///
/// A payload that is not a JSON object of the expected shape is a
/// `TransportError::Decode`. Individual detections with malformed boxes are
/// dropped; the rest of the response is kept.
pub fn decode_response(payload: &[u8]) -> Result<InferenceResponse, TransportError> {
    let wire: WireResponse = serde_json::from_slice(payload)?;
    let total = wire.detections.len();
    let detections: Vec<Detection> = wire
        .detections
        .into_iter()
        .filter_map(WireDetection::into_detection)
        .collect();
    if detections.len() != total {
        log::debug!(
            "dropped {} detection(s) with malformed boxes",
            total - detections.len()
        );
    }
    let time_ms = wire.time_ms.filter(|t| t.is_finite()).unwrap_or(0.0);
    Ok(InferenceResponse {
        detections,
        time_ms,
    })
}
