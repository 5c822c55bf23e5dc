//! Delivery of encoded frames to the remote detector.
//!
//! Two interchangeable modes against the same detector:
//! - Request mode (`RequestTransport`): one POST, one response.
//! - Stream mode (`StreamTransport`): a persistent channel that carries one
//!   frame per message and returns one JSON message per processed frame, in
//!   submission order.
//!
//! Endpoints with a `stub://` scheme resolve to an in-process detector.

mod endpoint;
mod http;
mod stub;
pub mod wire;
mod ws;

use std::time::Duration;

use crate::detect::{InferenceParameters, InferenceResponse};
use crate::error::TransportError;
use crate::frame::ImageMime;

pub use endpoint::DetectorEndpoint;
pub use http::HttpDetector;
pub use stub::{StubChannel, StubDetector};
pub use ws::WsChannel;

/// How long a stream channel blocks in `recv` before reporting "nothing yet".
pub const DEFAULT_STREAM_POLL: Duration = Duration::from_millis(50);

/// One-shot request/response delivery.
pub trait RequestTransport {
    /// Send one encoded image and wait for its detections. No retry.
    fn infer(
        &self,
        image: &[u8],
        mime: ImageMime,
        params: &InferenceParameters,
    ) -> Result<InferenceResponse, TransportError>;
}

/// What a stream channel hands back from `recv`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Raw payload of one detector message, not yet decoded.
    Message(Vec<u8>),
    /// The peer closed the channel.
    Closed,
}

/// An open stream-mode channel.
pub trait StreamChannel {
    /// Submit one encoded frame.
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Wait up to the channel's poll interval for the next event.
    ///
    /// `Ok(None)` means nothing arrived in time. An `Err` is a connection-level
    /// failure and ends the channel.
    fn recv(&mut self) -> Result<Option<ChannelEvent>, TransportError>;

    /// Close the channel. Idempotent.
    fn close(&mut self);
}

impl<C: StreamChannel + ?Sized> StreamChannel for Box<C> {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn recv(&mut self) -> Result<Option<ChannelEvent>, TransportError> {
        (**self).recv()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Opens stream-mode channels. Parameters are fixed for a channel's lifetime.
pub trait StreamTransport {
    type Channel: StreamChannel;

    fn open(&self, params: &InferenceParameters) -> Result<Self::Channel, TransportError>;
}

/// Detector selected from a configured endpoint.
pub enum Detector {
    Http(HttpDetector),
    Stub(StubDetector),
}

impl Detector {
    pub fn connect(endpoint: &DetectorEndpoint, poll: Duration) -> Self {
        match endpoint {
            DetectorEndpoint::Http(base) => Detector::Http(HttpDetector::new(base.clone(), poll)),
            DetectorEndpoint::Stub(name) => Detector::Stub(StubDetector::new(name)),
        }
    }

    /// Query the detector's health endpoint.
    pub fn health(&self) -> anyhow::Result<serde_json::Value> {
        match self {
            Detector::Http(detector) => detector.health(),
            Detector::Stub(detector) => Ok(detector.health()),
        }
    }
}

impl RequestTransport for Detector {
    fn infer(
        &self,
        image: &[u8],
        mime: ImageMime,
        params: &InferenceParameters,
    ) -> Result<InferenceResponse, TransportError> {
        match self {
            Detector::Http(detector) => detector.infer(image, mime, params),
            Detector::Stub(detector) => detector.infer(image, mime, params),
        }
    }
}

impl StreamTransport for Detector {
    type Channel = Box<dyn StreamChannel + Send>;

    fn open(&self, params: &InferenceParameters) -> Result<Self::Channel, TransportError> {
        match self {
            Detector::Http(detector) => Ok(Box::new(detector.open(params)?)),
            Detector::Stub(detector) => Ok(Box::new(detector.open(params)?)),
        }
    }
}
