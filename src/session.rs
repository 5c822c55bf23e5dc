//! A viewing session: detector parameters, smoothing and the overlay they feed.
//!
//! Every accepted response goes through the same path regardless of mode:
//! class filter, then the tracker when smoothing is on, then the sink.

use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;

use crate::detect::{Detection, InferenceParameters, InferenceResponse};
use crate::error::{PipelineError, TransportError};
use crate::frame::{FrameEncoding, FrameSource};
use crate::overlay::{Mode, OverlayFrame, OverlaySink};
use crate::pump::{FramePump, StreamSession};
use crate::tracker::{Tracker, TrackerConfig};
use crate::transport::{RequestTransport, StreamTransport};

pub struct ViewingSession<K: OverlaySink> {
    params: InferenceParameters,
    smoothing: bool,
    tracker: Tracker,
    sink: K,
}

impl<K: OverlaySink> ViewingSession<K> {
    pub fn new(params: InferenceParameters, sink: K) -> Self {
        Self {
            params,
            smoothing: false,
            tracker: Tracker::default(),
            sink,
        }
    }

    pub fn with_tracker(mut self, config: TrackerConfig) -> Self {
        self.tracker = Tracker::new(config);
        self
    }

    pub fn with_smoothing(mut self, enabled: bool) -> Self {
        self.set_smoothing(enabled);
        self
    }

    pub fn params(&self) -> &InferenceParameters {
        &self.params
    }

    /// Takes effect on the next request or stream session.
    pub fn set_params(&mut self, params: InferenceParameters) {
        self.params = params;
    }

    pub fn smoothing(&self) -> bool {
        self.smoothing
    }

    /// Toggling smoothing in either direction starts the tracker afresh.
    pub fn set_smoothing(&mut self, enabled: bool) {
        if self.smoothing != enabled {
            self.smoothing = enabled;
            self.tracker.reset();
            log::info!("smoothing {}", if enabled { "on" } else { "off" });
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Forget tracked objects and clear the overlay.
    pub fn restart(&mut self) {
        self.tracker.reset();
        self.sink.clear();
    }

    /// Filter, smooth and render one response.
    pub fn process(
        &mut self,
        mode: Mode,
        response: InferenceResponse,
        fps: Option<f64>,
    ) -> OverlayFrame {
        let raw: Vec<Detection> = response
            .detections
            .into_iter()
            .filter(|d| self.params.allows_label(&d.label))
            .collect();
        let detections = if self.smoothing {
            self.tracker.update(&raw)
        } else {
            raw
        };
        let frame = OverlayFrame {
            mode,
            detections,
            time_ms: response.time_ms,
            fps,
        };
        self.sink.render(&frame);
        frame
    }

    /// Capture one frame and run it through request mode. No retry.
    pub fn detect_once<S, T>(
        &mut self,
        source: &mut S,
        transport: &T,
        encoding: &FrameEncoding,
    ) -> Result<OverlayFrame, PipelineError>
    where
        S: FrameSource + ?Sized,
        T: RequestTransport + ?Sized,
    {
        let image = source.capture(encoding)?;
        let response = transport.infer(&image, encoding.mime, &self.params)?;
        log::debug!(
            "request answered: {} detections in {:.1}ms",
            response.detections.len(),
            response.time_ms
        );
        Ok(self.process(Mode::Request, response, None))
    }

    /// Run one stream session until `stop` is raised, the channel ends, or
    /// `max_frames` responses have been rendered.
    ///
    /// Each call opens a fresh channel with the current parameters and starts
    /// the tracker afresh.
    pub fn stream<S, T>(
        &mut self,
        source: &mut S,
        transport: &T,
        encoding: &FrameEncoding,
        stop: &AtomicBool,
        max_frames: Option<u64>,
    ) -> Result<StreamSession, TransportError>
    where
        S: FrameSource + ?Sized,
        T: StreamTransport + ?Sized,
    {
        self.tracker.reset();
        let mut pump = FramePump::new(*encoding);
        let mut channel = pump.open(transport, &self.params)?;
        let mut rendered = 0u64;
        pump.run(source, &mut channel, stop, |response, fps| {
            self.process(Mode::Stream, response, fps);
            rendered += 1;
            if max_frames.map_or(false, |max| rendered >= max) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        Ok(pump.session().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<OverlayFrame>,
        clears: usize,
    }

    impl OverlaySink for Recorder {
        fn render(&mut self, frame: &OverlayFrame) {
            self.frames.push(frame.clone());
        }

        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    fn response(labels: &[&str]) -> InferenceResponse {
        InferenceResponse {
            detections: labels
                .iter()
                .map(|l| Detection::new(*l, 0, 0.9, BBox::new(10.0, 10.0, 50.0, 50.0)))
                .collect(),
            time_ms: 4.0,
        }
    }

    #[test]
    fn class_filter_drops_unlisted_labels() {
        let params = InferenceParameters {
            include_classes: vec!["person".into()],
            ..Default::default()
        };
        let mut session = ViewingSession::new(params, Recorder::default());
        let frame = session.process(Mode::Stream, response(&["person", "cat"]), None);
        assert_eq!(frame.detections.len(), 1);
        assert_eq!(frame.detections[0].label, "person");
    }

    #[test]
    fn smoothing_off_renders_raw_scores() {
        let mut session = ViewingSession::new(InferenceParameters::default(), Recorder::default());
        session.process(Mode::Request, response(&["person"]), None);
        let frame = session.process(Mode::Request, response(&["person"]), None);
        assert_eq!(frame.detections[0].score, 0.9);
        assert!(session.tracker().tracks().is_empty());
    }

    #[test]
    fn smoothing_on_reports_confirmed_tracks() {
        let mut session = ViewingSession::new(InferenceParameters::default(), Recorder::default())
            .with_smoothing(true);
        session.process(Mode::Stream, response(&["person"]), None);
        let frame = session.process(Mode::Stream, response(&["person"]), Some(10.0));
        assert_eq!(frame.detections[0].score, 0.0);
        assert_eq!(session.tracker().tracks()[0].hits, 2);
        assert_eq!(session.sink().frames.len(), 2);
    }

    #[test]
    fn toggling_smoothing_resets_tracker() {
        let mut session = ViewingSession::new(InferenceParameters::default(), Recorder::default())
            .with_smoothing(true);
        session.process(Mode::Stream, response(&["person"]), None);
        session.set_smoothing(false);
        session.set_smoothing(true);
        assert!(session.tracker().tracks().is_empty());
    }

    #[test]
    fn restart_clears_tracks_and_overlay() {
        let mut session = ViewingSession::new(InferenceParameters::default(), Recorder::default())
            .with_smoothing(true);
        session.process(Mode::Stream, response(&["person"]), None);
        session.restart();
        assert!(session.tracker().tracks().is_empty());
        assert_eq!(session.sink().clears, 1);
    }
}
