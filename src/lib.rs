//! Swift Detect
//!
//! Client side of a live object-detection overlay: capture camera frames,
//! ship them to a remote detector, and draw the returned boxes.
//!
//! # Architecture
//!
//! 1. **Request mode**: one frame, one POST, one response.
//! 2. **Stream mode**: a persistent channel with exactly one frame in flight;
//!    the next frame is captured only when the previous one was answered.
//! 3. **Smoothing**: an optional IoU tracker that reports only objects seen on
//!    consecutive frames.
//!
//! # Module Structure
//!
//! - `frame`: Encoding of captured frames, the `FrameSource` seam
//! - `ingest`: Camera sources (synthetic, still file, HTTP snapshot)
//! - `transport`: HTTP/WebSocket and in-process detectors
//! - `pump`: Single-credit flow control for stream mode
//! - `tracker`: Cross-frame smoothing
//! - `session`: Filter, smooth and render pipeline
//! - `overlay`: Output sinks

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod pump;
pub mod session;
pub mod tracker;
pub mod transport;

pub use config::ClientConfig;
pub use detect::{BBox, Detection, InferenceParameters, InferenceResponse};
pub use error::{CaptureError, PipelineError, TransportError};
pub use frame::{FrameEncoding, FrameSlot, FrameSource, ImageMime, RawFrame};
pub use ingest::{CameraSource, SourceConfig};
pub use overlay::{JsonLinesSink, LogSink, Mode, OverlayFrame, OverlaySink};
pub use pump::{FpsMeter, FramePump, SessionState, StreamSession, SubmitOutcome};
pub use session::ViewingSession;
pub use tracker::{Track, Tracker, TrackerConfig};
pub use transport::{
    ChannelEvent, Detector, DetectorEndpoint, RequestTransport, StreamChannel, StreamTransport,
};
