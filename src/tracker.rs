//! Temporal smoothing of per-frame detections.
//!
//! Each raw detection is greedily associated with the best-overlapping
//! unmatched track of the same label. A track is only reported once it has
//! been seen on at least `min_hits` frames, which suppresses single-frame false
//! positives. Tracks survive `max_age` consecutive misses before eviction, so a
//! briefly occluded object keeps its identity.
//!
//! Matching is a per-detection best-IoU scan, not a global assignment. Label
//! partitioning keeps the candidate sets small enough for that to hold up.

use crate::detect::{BBox, Detection};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Minimum IoU (inclusive) for a detection to continue a track.
    pub iou_threshold: f32,
    /// Hits required before a track is reported.
    pub min_hits: u32,
    /// Tracks whose age exceeds this are evicted.
    pub max_age: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            min_hits: 2,
            max_age: 5,
        }
    }
}

/// Cross-frame identity hypothesis.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub label: String,
    /// Last matched box.
    pub bbox: BBox,
    /// Successful associations, including the one that created the track.
    pub hits: u32,
    /// Frames since the last successful association.
    pub age: u32,
}

impl Track {
    fn from_detection(detection: &Detection) -> Self {
        Self {
            label: detection.label.clone(),
            bbox: detection.bbox,
            hits: 1,
            age: 0,
        }
    }

    fn to_detection(&self) -> Detection {
        Detection::new(self.label.clone(), 0, 0.0, self.bbox)
    }
}

#[derive(Debug, Default)]
pub struct Tracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Drop all tracks.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// Fold one frame of raw detections into the track set and return the
    /// stabilized detections.
    ///
    /// Until some track is confirmed the raw detections are returned as-is,
    /// so the first frames of a session are never blank.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Detection> {
        let mut matched = vec![false; self.tracks.len()];

        for detection in detections {
            match self.best_match(detection, &matched) {
                Some(idx) => {
                    let track = &mut self.tracks[idx];
                    track.bbox = detection.bbox;
                    track.hits += 1;
                    track.age = 0;
                    matched[idx] = true;
                }
                None => {
                    self.tracks.push(Track::from_detection(detection));
                    matched.push(true);
                }
            }
        }

        let max_age = self.config.max_age;
        let mut matched = matched.into_iter();
        self.tracks.retain_mut(|track| {
            if !matched.next().unwrap_or(false) {
                track.age += 1;
            }
            track.age <= max_age
        });

        let stable: Vec<Detection> = self
            .tracks
            .iter()
            .filter(|t| t.hits >= self.config.min_hits)
            .map(Track::to_detection)
            .collect();
        log::trace!(
            "tracker: {} raw, {} tracks, {} stable",
            detections.len(),
            self.tracks.len(),
            stable.len()
        );
        if stable.is_empty() {
            detections.to_vec()
        } else {
            stable
        }
    }

    /// Index of the unmatched same-label track with the highest IoU, if that
    /// IoU clears the threshold. Ties keep the older track.
    fn best_match(&self, detection: &Detection, matched: &[bool]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, track) in self.tracks.iter().enumerate() {
            if matched[idx] || track.label != detection.label {
                continue;
            }
            let overlap = track.bbox.iou(&detection.bbox);
            if best.map_or(true, |(_, b)| overlap > b) {
                best = Some((idx, overlap));
            }
        }
        best.filter(|(_, overlap)| *overlap >= self.config.iou_threshold)
            .map(|(idx, _)| idx)
    }
}
