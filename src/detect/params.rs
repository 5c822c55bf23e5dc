use anyhow::{anyhow, Result};

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_NMS_IOU: f32 = 0.45;
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Per-request detector configuration.
///
/// `iou` is the threshold for the remote detector's own non-maximum
/// suppression and has nothing to do with the client-side tracker.
/// A value is fixed for the lifetime of a stream session; changing it means
/// opening a new session.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceParameters {
    pub confidence: f32,
    pub iou: f32,
    pub max_results: u32,
    /// Empty means "all classes".
    pub include_classes: Vec<String>,
    /// Minimum box area as a fraction of the frame area.
    pub min_area_ratio: Option<f32>,
}

impl Default for InferenceParameters {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_NMS_IOU,
            max_results: DEFAULT_MAX_RESULTS,
            include_classes: Vec::new(),
            min_area_ratio: None,
        }
    }
}

impl InferenceParameters {
    pub fn validate(&self) -> Result<()> {
        check_unit("confidence", self.confidence)?;
        check_unit("iou", self.iou)?;
        if let Some(ratio) = self.min_area_ratio {
            check_unit("min_area_ratio", ratio)?;
        }
        if self.max_results == 0 {
            return Err(anyhow!("max_results must be at least 1"));
        }
        Ok(())
    }

    /// Query parameters in the order the detector API documents them.
    ///
    /// `include_classes` and `min_area_ratio` are omitted when unset.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("conf", self.confidence.to_string()),
            ("iou", self.iou.to_string()),
            ("max_results", self.max_results.to_string()),
        ];
        if !self.include_classes.is_empty() {
            pairs.push(("include_classes", self.include_classes.join(",")));
        }
        if let Some(ratio) = self.min_area_ratio {
            pairs.push(("min_area_ratio", ratio.to_string()));
        }
        pairs
    }

    pub fn allows_label(&self, label: &str) -> bool {
        self.include_classes.is_empty() || self.include_classes.iter().any(|c| c == label)
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}
