mod params;
mod result;

pub use params::{
    InferenceParameters, DEFAULT_CONFIDENCE, DEFAULT_MAX_RESULTS, DEFAULT_NMS_IOU,
};
pub use result::{BBox, Detection, InferenceResponse, DEFAULT_LABEL};
