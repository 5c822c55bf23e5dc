use serde::{Deserialize, Serialize};

/// Label reported when the detector omits one.
pub const DEFAULT_LABEL: &str = "obj";

/// Axis-aligned box in source-image pixels: top-left corner plus size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build a box from untrusted coordinates.
    ///
    /// Returns `None` when any coordinate is NaN or infinite. Negative sizes
    /// are clamped to zero.
    pub fn sanitized(x: f32, y: f32, w: f32, h: f32) -> Option<Self> {
        if [x, y, w, h].iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        })
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Intersection over union. A zero-area union yields 0.
    pub fn iou(&self, other: &BBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

impl From<[f32; 4]> for BBox {
    fn from([x, y, w, h]: [f32; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

/// One object instance reported by the detector for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub class_id: i64,
    /// Confidence in [0, 1].
    pub score: f32,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, class_id: i64, score: f32, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            class_id,
            score: score.clamp(0.0, 1.0),
            bbox,
        }
    }
}

/// Result of one detector round trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InferenceResponse {
    pub detections: Vec<Detection>,
    /// Server-reported processing time in milliseconds.
    pub time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_box_with_itself_is_one() {
        let b = BBox::new(10.0, 20.0, 30.0, 40.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        // Touching edges share no area.
        let c = BBox::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_boxes_have_zero_iou() {
        let a = BBox::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn sanitized_rejects_non_finite_and_clamps_size() {
        assert!(BBox::sanitized(f32::NAN, 0.0, 1.0, 1.0).is_none());
        assert!(BBox::sanitized(0.0, 0.0, f32::INFINITY, 1.0).is_none());
        let b = BBox::sanitized(1.0, 2.0, -3.0, 4.0).unwrap();
        assert_eq!(b, BBox::new(1.0, 2.0, 0.0, 4.0));
    }

    #[test]
    fn bbox_serializes_as_array() {
        let json = serde_json::to_string(&BBox::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
    }
}
