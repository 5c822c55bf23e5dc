//! Frame sources.
//!
//! This module provides the live feeds the pump can capture from:
//! - Synthetic moving pattern (`stub://` URIs, tests and demos)
//! - Still image files, re-read on every capture
//! - HTTP JPEG snapshot cameras (`http://`, `https://`)
//!
//! Every source produces the newest frame it can see at capture time. None of
//! them buffer frames between captures.

mod file;
mod snapshot;
mod synthetic;

use crate::error::CaptureError;
use crate::frame::{FrameEncoding, FrameSource};

pub use file::FileSource;
pub use snapshot::SnapshotSource;
pub use synthetic::SyntheticSource;

pub const DEFAULT_SOURCE_URI: &str = "stub://camera";
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;

/// Configuration for a camera source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
    /// `stub://<name>`, `http(s)://<snapshot url>` or a local image path.
    pub uri: String,
    /// Frame width (synthetic frames only).
    pub width: u32,
    /// Frame height (synthetic frames only).
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_SOURCE_URI.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Camera source selected by URI scheme.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticSource),
    File(FileSource),
    Snapshot(SnapshotSource),
}

impl CameraSource {
    pub fn new(config: SourceConfig) -> anyhow::Result<Self> {
        let uri = config.uri.trim();
        if uri.is_empty() {
            anyhow::bail!("camera source uri must not be empty");
        }
        let backend = if uri.starts_with("stub://") {
            CameraBackend::Synthetic(SyntheticSource::new(config.width, config.height))
        } else if uri.starts_with("http://") || uri.starts_with("https://") {
            CameraBackend::Snapshot(SnapshotSource::new(uri)?)
        } else if uri.contains("://") {
            anyhow::bail!("unsupported camera uri '{}'", uri);
        } else {
            CameraBackend::File(FileSource::new(uri))
        };
        log::info!("camera source: {}", uri);
        Ok(Self { backend })
    }

    /// Number of frames handed out so far.
    pub fn frames_captured(&self) -> u64 {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.frames_captured(),
            CameraBackend::File(source) => source.frames_captured(),
            CameraBackend::Snapshot(source) => source.frames_captured(),
        }
    }
}

impl FrameSource for CameraSource {
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.capture(encoding),
            CameraBackend::File(source) => source.capture(encoding),
            CameraBackend::Snapshot(source) => source.capture(encoding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_scheme() {
        let config = SourceConfig {
            uri: "rtsp://camera".into(),
            ..Default::default()
        };
        assert!(CameraSource::new(config).is_err());
    }

    #[test]
    fn stub_uri_selects_synthetic_source() {
        let mut source = CameraSource::new(SourceConfig::default()).unwrap();
        let bytes = source.capture(&FrameEncoding::jpeg(50)).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(source.frames_captured(), 1);
    }
}
