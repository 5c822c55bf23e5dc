//! Overlay sinks: where stabilized detections end up.
//!
//! The overlay is drawn by the embedding application. This crate only hands
//! it an `OverlayFrame` per result; the sinks here print to a log or to a
//! JSON-lines writer.

use std::fmt;
use std::io::Write;

use serde::Serialize;

use crate::detect::Detection;

/// Delivery mode a result came through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[serde(rename = "POST")]
    Request,
    #[serde(rename = "WS")]
    Stream,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Request => "POST",
            Mode::Stream => "WS",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One result ready to draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub mode: Mode,
    pub detections: Vec<Detection>,
    /// Server-side processing time.
    pub time_ms: f64,
    /// Pump rate estimate; stream mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
}

impl OverlayFrame {
    /// Short caption drawn next to the boxes, e.g. `WS 2 • 12.3ms`.
    pub fn watermark(&self) -> String {
        let mut text = format!(
            "{} {} • {:.1}ms",
            self.mode,
            self.detections.len(),
            self.time_ms
        );
        if let Some(fps) = self.fps {
            text.push_str(&format!(" • {:.1}fps", fps));
        }
        text
    }
}

pub trait OverlaySink {
    /// Replace whatever is on screen with `frame`.
    fn render(&mut self, frame: &OverlayFrame);

    /// Remove the overlay.
    fn clear(&mut self) {}
}

impl<K: OverlaySink + ?Sized> OverlaySink for &mut K {
    fn render(&mut self, frame: &OverlayFrame) {
        (**self).render(frame)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

impl<K: OverlaySink + ?Sized> OverlaySink for Box<K> {
    fn render(&mut self, frame: &OverlayFrame) {
        (**self).render(frame)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

/// Logs the watermark and one line per box.
#[derive(Debug, Default)]
pub struct LogSink;

impl OverlaySink for LogSink {
    fn render(&mut self, frame: &OverlayFrame) {
        log::info!("{}", frame.watermark());
        for det in &frame.detections {
            log::debug!(
                "  {} [{:.0}, {:.0}, {:.0}, {:.0}]",
                det.label,
                det.bbox.x,
                det.bbox.y,
                det.bbox.w,
                det.bbox.h
            );
        }
    }

    fn clear(&mut self) {
        log::info!("overlay cleared");
    }
}

/// Writes every frame as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OverlaySink for JsonLinesSink<W> {
    fn render(&mut self, frame: &OverlayFrame) {
        let written = serde_json::to_writer(&mut self.out, frame)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            log::warn!("overlay output failed: {}", e);
        }
    }
}
