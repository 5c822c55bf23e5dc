//! HTTP JPEG snapshot camera.
//!
//! Each capture fetches one JPEG from the camera's snapshot URL and re-encodes
//! it with the caller's encoding. An unreachable camera is `Unavailable`
//! rather than fatal, so a flaky camera only pauses the pump.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::error::CaptureError;
use crate::frame::{FrameEncoding, FrameSource, RawFrame};

const MAX_SNAPSHOT_BYTES: u64 = 5 * 1024 * 1024;
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SnapshotSource {
    url: Url,
    agent: ureq::Agent,
    frame_count: u64,
}

impl SnapshotSource {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).context("parse snapshot url")?;
        let agent = ureq::AgentBuilder::new().timeout(SNAPSHOT_TIMEOUT).build();
        Ok(Self {
            url,
            agent,
            frame_count: 0,
        })
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(self.url.as_str())
            .call()
            .with_context(|| format!("fetch snapshot from {}", self.url))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_SNAPSHOT_BYTES)
            .read_to_end(&mut bytes)
            .context("read snapshot body")?;
        if bytes.is_empty() {
            anyhow::bail!("empty snapshot");
        }
        Ok(bytes)
    }
}

fn decode(bytes: &[u8]) -> Result<RawFrame, CaptureError> {
    let image = image::load_from_memory(bytes).map_err(|e| {
        log::debug!("snapshot not decodable: {}", e);
        CaptureError::Unavailable
    })?;
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    RawFrame::new(rgb.into_raw(), width, height)
}

impl FrameSource for SnapshotSource {
    fn capture(&mut self, encoding: &FrameEncoding) -> Result<Vec<u8>, CaptureError> {
        let bytes = self.fetch().map_err(|e| {
            log::warn!("snapshot camera unavailable: {:#}", e);
            CaptureError::Unavailable
        })?;
        let encoded = decode(&bytes)?.encode(encoding)?;
        self.frame_count += 1;
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_unavailable() {
        assert!(matches!(
            decode(b"not a jpeg"),
            Err(CaptureError::Unavailable)
        ));
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(SnapshotSource::new("http://").is_err());
    }
}
