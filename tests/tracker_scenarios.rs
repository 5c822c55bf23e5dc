use swift_detect::{BBox, Detection, InferenceParameters, InferenceResponse, Mode, OverlayFrame};
use swift_detect::{OverlaySink, Tracker, ViewingSession};

fn det(label: &str, x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection::new(label, 0, 0.8, BBox::new(x, y, w, h))
}

#[derive(Default)]
struct Recorder(Vec<OverlayFrame>);

impl OverlaySink for Recorder {
    fn render(&mut self, frame: &OverlayFrame) {
        self.0.push(frame.clone());
    }
}

#[test]
fn iou_identity_and_disjoint() {
    let a = BBox::new(3.0, 4.0, 10.0, 20.0);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    let b = BBox::new(100.0, 100.0, 5.0, 5.0);
    assert_eq!(a.iou(&b), 0.0);
}

#[test]
fn stable_cat_confirmed_from_second_frame() {
    let mut tracker = Tracker::default();
    let frame = [det("cat", 40.0, 40.0, 60.0, 60.0)];

    let first = tracker.update(&frame);
    assert_eq!(first, frame.to_vec());

    let second = tracker.update(&frame);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].score, 0.0);

    let third = tracker.update(&frame);
    assert_eq!(third.len(), 1);
    assert_eq!(tracker.tracks().len(), 1);
    assert_eq!(tracker.tracks()[0].hits, 3);
}

#[test]
fn evicted_track_is_never_rematched() {
    let mut tracker = Tracker::default();
    let frame = [det("cat", 0.0, 0.0, 50.0, 50.0)];
    for _ in 0..3 {
        tracker.update(&frame);
    }
    assert_eq!(tracker.tracks()[0].hits, 3);

    for _ in 0..6 {
        tracker.update(&[]);
    }
    assert!(tracker.tracks().is_empty());

    // Same box again starts from scratch.
    let back = tracker.update(&frame);
    assert_eq!(back, frame.to_vec());
    assert_eq!(tracker.tracks()[0].hits, 1);
}

#[test]
fn labels_never_share_tracks() {
    let mut tracker = Tracker::default();
    tracker.update(&[det("cat", 0.0, 0.0, 50.0, 50.0)]);
    tracker.update(&[det("dog", 0.0, 0.0, 50.0, 50.0)]);
    let labels: Vec<&str> = tracker.tracks().iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["cat", "dog"]);
    assert!(tracker.tracks().iter().all(|t| t.hits == 1));
}

#[test]
fn person_over_four_frames_end_to_end() {
    let mut session =
        ViewingSession::new(InferenceParameters::default(), Recorder::default()).with_smoothing(true);
    let boxes = [
        BBox::new(100.0, 80.0, 60.0, 120.0),
        BBox::new(102.0, 81.0, 60.0, 120.0),
        BBox::new(104.0, 82.0, 60.0, 120.0),
        BBox::new(106.0, 83.0, 60.0, 120.0),
    ];

    let mut hits = Vec::new();
    for bbox in boxes {
        let response = InferenceResponse {
            detections: vec![Detection::new("person", 0, 0.91, bbox)],
            time_ms: 7.5,
        };
        session.process(Mode::Stream, response, None);
        hits.push(session.tracker().tracks()[0].hits);
    }
    assert_eq!(hits, vec![1, 2, 3, 4]);

    let frames = &session.sink().0;
    assert_eq!(frames.len(), 4);
    // Frame 1 is the raw pass-through.
    assert_eq!(frames[0].detections[0].score, 0.91);
    for (frame, bbox) in frames[1..].iter().zip(&boxes[1..]) {
        assert_eq!(frame.detections.len(), 1);
        assert_eq!(frame.detections[0].label, "person");
        assert_eq!(frame.detections[0].score, 0.0);
        assert_eq!(frame.detections[0].bbox, *bbox);
    }
}
