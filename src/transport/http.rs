use std::io::Read;
use std::time::Duration;

use anyhow::Context;
use url::Url;

use super::endpoint::{health_url, image_url, stream_url};
use super::wire::decode_response;
use super::ws::WsChannel;
use super::{RequestTransport, StreamTransport};
use crate::detect::{InferenceParameters, InferenceResponse};
use crate::error::TransportError;
use crate::frame::ImageMime;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RESPONSE_BYTES: u64 = 4 * 1024 * 1024;

/// Detector reached over HTTP (request mode) and WebSocket (stream mode).
pub struct HttpDetector {
    base: Url,
    agent: ureq::Agent,
    stream_poll: Duration,
}

impl HttpDetector {
    pub fn new(base: Url, stream_poll: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            base,
            agent,
            stream_poll,
        }
    }

    pub fn health(&self) -> anyhow::Result<serde_json::Value> {
        let url = health_url(&self.base)?;
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .with_context(|| format!("health check {}", url))?;
        let body = read_body(response)?;
        serde_json::from_slice(&body).context("health response is not JSON")
    }
}

impl RequestTransport for HttpDetector {
    fn infer(
        &self,
        image: &[u8],
        mime: ImageMime,
        params: &InferenceParameters,
    ) -> Result<InferenceResponse, TransportError> {
        let url = image_url(&self.base, params)
            .map_err(|e| TransportError::Network(format!("bad request url: {}", e)))?;
        let boundary = format!("swiftdetect-{:016x}", rand::random::<u64>());
        let body = multipart_body(&boundary, mime, image);
        log::debug!("POST {} ({} bytes)", url.path(), image.len());

        let response = self
            .agent
            .post(url.as_str())
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
            .map_err(network_error)?;
        let payload = read_body(response)?;
        decode_response(&payload)
    }
}

impl StreamTransport for HttpDetector {
    type Channel = WsChannel;

    fn open(&self, params: &InferenceParameters) -> Result<WsChannel, TransportError> {
        let url = stream_url(&self.base, params)
            .map_err(|e| TransportError::Network(format!("bad stream url: {}", e)))?;
        WsChannel::connect(&url, self.stream_poll)
    }
}

fn network_error(e: ureq::Error) -> TransportError {
    match e {
        ureq::Error::Status(code, _) => {
            TransportError::Network(format!("detector returned status {}", code))
        }
        ureq::Error::Transport(t) => TransportError::Network(t.to_string()),
    }
}

fn read_body(response: ureq::Response) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    response
        .into_reader()
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut body)
        .map_err(|e| TransportError::Network(format!("read response body: {}", e)))?;
    Ok(body)
}

/// Single-part `multipart/form-data` body with the image in field `file`.
fn multipart_body(boundary: &str, mime: ImageMime, image: &[u8]) -> Vec<u8> {
    let head = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {mime}\r\n\r\n",
        boundary = boundary,
        name = mime.file_name(),
        mime = mime.as_str(),
    );
    let tail = format!("\r\n--{}--\r\n", boundary);
    let mut body = Vec::with_capacity(head.len() + image.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(image);
    body.extend_from_slice(tail.as_bytes());
    body
}
