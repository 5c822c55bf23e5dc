//! Single-credit frame pump for stream mode.
//!
//! The pump keeps at most one frame in flight on a stream channel. A new frame
//! is captured only after the previous one was answered (or lost), so capture
//! can never run ahead of the detector and the overlay lags the camera by at
//! most one round trip, whatever the capture rate or network jitter.
//!
//! The loop has two phases:
//! - `AwaitingFrame`: nothing in flight; capture and submit, or yield briefly
//!   when the source has no frame yet.
//! - `AwaitingResponse`: one frame in flight; wait on the channel.
//!
//! Responses that arrive after the session stopped, or when no frame is in
//! flight, are discarded and never reach the caller.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::detect::{InferenceParameters, InferenceResponse};
use crate::error::{CaptureError, TransportError};
use crate::frame::{FrameEncoding, FrameSource};
use crate::transport::wire::decode_response;
use crate::transport::{ChannelEvent, StreamChannel, StreamTransport};

/// Pause before retrying capture when the source has no frame (about one display frame).
pub const FRAME_RETRY_DELAY: Duration = Duration::from_millis(16);

/// Weight of the newest sample in the frame-rate average.
const FPS_SMOOTHING: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Errored,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Errored)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpPhase {
    AwaitingFrame,
    AwaitingResponse,
}

/// Result of one submission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A frame is now in flight.
    Submitted,
    /// The source had no frame; try again later.
    Deferred,
    /// A frame is already in flight; nothing was sent.
    Busy,
    /// The session is not open (or just failed); nothing was sent.
    Inactive,
}

/// Bookkeeping for one stream-mode channel.
#[derive(Clone, Debug)]
pub struct StreamSession {
    pub state: SessionState,
    pub in_flight: bool,
    pub last_response_at: Option<Instant>,
    pub frames_sent: u64,
    pub responses: u64,
    pub dropped: u64,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            in_flight: false,
            last_response_at: None,
            frames_sent: 0,
            responses: 0,
            dropped: 0,
        }
    }
}

/// Exponentially weighted frame rate from inter-response intervals.
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsMeter {
    fps: Option<f64>,
    last: Option<Instant>,
}

impl FpsMeter {
    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last {
            let dt_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
            let inst = 1000.0 / dt_ms.max(1.0);
            self.fps = Some(match self.fps {
                Some(prev) => prev * (1.0 - FPS_SMOOTHING) + inst * FPS_SMOOTHING,
                None => inst,
            });
        }
        self.last = Some(now);
    }

    /// Current estimate, `None` until two responses have been seen.
    pub fn fps(&self) -> Option<f64> {
        self.fps
    }
}

pub struct FramePump {
    session: StreamSession,
    fps: FpsMeter,
    encoding: FrameEncoding,
}

impl FramePump {
    pub fn new(encoding: FrameEncoding) -> Self {
        Self {
            session: StreamSession::default(),
            fps: FpsMeter::default(),
            encoding,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps.fps()
    }

    pub fn phase(&self) -> PumpPhase {
        if self.session.in_flight {
            PumpPhase::AwaitingResponse
        } else {
            PumpPhase::AwaitingFrame
        }
    }

    /// Open a channel on `transport`. The pump becomes `Open` or `Errored`.
    pub fn open<T: StreamTransport + ?Sized>(
        &mut self,
        transport: &T,
        params: &InferenceParameters,
    ) -> Result<T::Channel, TransportError> {
        self.session.state = SessionState::Connecting;
        match transport.open(params) {
            Ok(channel) => {
                self.mark_open();
                Ok(channel)
            }
            Err(e) => {
                log::warn!("stream open failed: {}", e);
                self.session.state = SessionState::Errored;
                Err(e)
            }
        }
    }

    /// Mark a channel opened elsewhere as open.
    pub fn mark_open(&mut self) {
        self.session = StreamSession {
            state: SessionState::Open,
            ..StreamSession::default()
        };
        self.fps = FpsMeter::default();
        log::info!("stream session open");
    }

    /// Capture and send one frame if the credit is free.
    pub fn submit<S, C>(&mut self, source: &mut S, channel: &mut C) -> SubmitOutcome
    where
        S: FrameSource + ?Sized,
        C: StreamChannel + ?Sized,
    {
        if self.session.state != SessionState::Open {
            return SubmitOutcome::Inactive;
        }
        if self.session.in_flight {
            return SubmitOutcome::Busy;
        }
        let frame = match source.capture(&self.encoding) {
            Ok(frame) => frame,
            Err(CaptureError::Unavailable) => return SubmitOutcome::Deferred,
            Err(e) => {
                log::warn!("stream session deactivated: {}", e);
                self.fail(channel);
                return SubmitOutcome::Inactive;
            }
        };
        let len = frame.len();
        match channel.send(frame) {
            Ok(()) => {
                self.session.in_flight = true;
                self.session.frames_sent += 1;
                log::debug!("frame #{} sent ({} bytes)", self.session.frames_sent, len);
                SubmitOutcome::Submitted
            }
            Err(e) => {
                log::warn!("stream session deactivated: {}", e);
                self.fail(channel);
                SubmitOutcome::Inactive
            }
        }
    }

    /// Handle one detector message. Returns the response if it should be
    /// delivered; stale, unsolicited and undecodable messages yield `None`.
    pub fn on_message(&mut self, payload: &[u8], now: Instant) -> Option<InferenceResponse> {
        if self.session.state != SessionState::Open || !self.session.in_flight {
            let violation = TransportError::ProtocolViolation(format!(
                "message with no frame in flight (state {:?})",
                self.session.state
            ));
            log::debug!("discarded: {}", violation);
            self.session.dropped += 1;
            return None;
        }
        self.session.in_flight = false;
        match decode_response(payload) {
            Ok(response) => {
                self.session.responses += 1;
                self.session.last_response_at = Some(now);
                self.fps.record(now);
                Some(response)
            }
            Err(e) => {
                log::warn!("dropped detector message: {}", e);
                self.session.dropped += 1;
                None
            }
        }
    }

    /// The peer closed the channel.
    pub fn on_closed(&mut self) {
        if self.session.state.is_terminal() {
            return;
        }
        if self.session.in_flight {
            log::info!("stream closed with a frame in flight; frame lost");
        }
        self.session.in_flight = false;
        self.session.state = SessionState::Closed;
        log::info!("stream session closed by peer");
    }

    /// The channel failed at the connection level.
    pub fn on_error(&mut self, error: &TransportError) {
        if self.session.state.is_terminal() {
            return;
        }
        log::warn!("stream session error: {}", error);
        self.session.in_flight = false;
        self.session.state = SessionState::Errored;
    }

    /// Stop the session. No further frames are sent and any response still
    /// on the wire is discarded.
    pub fn stop<C: StreamChannel + ?Sized>(&mut self, channel: &mut C) {
        if self.session.state.is_terminal() {
            return;
        }
        self.session.state = SessionState::Closing;
        channel.close();
        self.session.in_flight = false;
        self.session.state = SessionState::Closed;
        log::info!(
            "stream session stopped: {} sent, {} answered, {} dropped",
            self.session.frames_sent,
            self.session.responses,
            self.session.dropped
        );
    }

    fn fail<C: StreamChannel + ?Sized>(&mut self, channel: &mut C) {
        channel.close();
        self.session.in_flight = false;
        self.session.state = SessionState::Errored;
    }

    /// Drive the session until it ends, `stop` is raised, or `deliver` breaks.
    ///
    /// `deliver` receives each in-order response and the current frame-rate
    /// estimate. Returns the terminal state.
    pub fn run<S, C, F>(
        &mut self,
        source: &mut S,
        channel: &mut C,
        stop: &AtomicBool,
        mut deliver: F,
    ) -> SessionState
    where
        S: FrameSource + ?Sized,
        C: StreamChannel + ?Sized,
        F: FnMut(InferenceResponse, Option<f64>) -> ControlFlow<()>,
    {
        while self.session.state == SessionState::Open {
            if stop.load(Ordering::SeqCst) {
                self.stop(channel);
                break;
            }
            if self.phase() == PumpPhase::AwaitingFrame {
                match self.submit(source, channel) {
                    // Nothing in flight, so there is nothing to wait for on the channel.
                    SubmitOutcome::Deferred => {
                        std::thread::sleep(FRAME_RETRY_DELAY);
                        continue;
                    }
                    SubmitOutcome::Inactive => break,
                    SubmitOutcome::Submitted | SubmitOutcome::Busy => {}
                }
            }
            match channel.recv() {
                Ok(Some(ChannelEvent::Message(payload))) => {
                    if let Some(response) = self.on_message(&payload, Instant::now()) {
                        if deliver(response, self.fps()).is_break() {
                            self.stop(channel);
                        }
                    }
                }
                Ok(Some(ChannelEvent::Closed)) => self.on_closed(),
                Ok(None) => {}
                Err(e) => {
                    self.on_error(&e);
                    channel.close();
                }
            }
        }
        self.session.state
    }
}
