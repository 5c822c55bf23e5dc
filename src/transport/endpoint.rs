use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::detect::InferenceParameters;

const IMAGE_PATH: &str = "api/v1/infer/image";
const STREAM_PATH: &str = "api/v1/infer/stream";
const HEALTH_PATH: &str = "api/health";

/// Where the detector lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectorEndpoint {
    /// Base URL of the detector API, e.g. `http://127.0.0.1:8000/`.
    Http(Url),
    /// In-process stub detector.
    Stub(String),
}

impl DetectorEndpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some(name) = raw.strip_prefix("stub://") {
            return Ok(DetectorEndpoint::Stub(name.to_string()));
        }
        let mut url = Url::parse(raw).with_context(|| format!("invalid detector url {}", raw))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("unsupported detector scheme: {}", other)),
        }
        if url.host_str().is_none() {
            return Err(anyhow!("detector url has no host: {}", raw));
        }
        // Joining relative paths needs a trailing slash on the base.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        Ok(DetectorEndpoint::Http(url))
    }
}

pub(crate) fn image_url(base: &Url, params: &InferenceParameters) -> Result<Url> {
    let mut url = base.join(IMAGE_PATH)?;
    append_params(&mut url, params);
    Ok(url)
}

/// Stream URL: same host, `ws`/`wss` scheme, same query parameters.
pub(crate) fn stream_url(base: &Url, params: &InferenceParameters) -> Result<Url> {
    let mut url = base.join(STREAM_PATH)?;
    let scheme = match url.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("cannot derive websocket url from {}", base))?;
    append_params(&mut url, params);
    Ok(url)
}

pub(crate) fn health_url(base: &Url) -> Result<Url> {
    Ok(base.join(HEALTH_PATH)?)
}

fn append_params(url: &mut Url, params: &InferenceParameters) {
    let mut query = url.query_pairs_mut();
    for (key, value) in params.query_pairs() {
        query.append_pair(key, &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(raw: &str) -> Url {
        match DetectorEndpoint::parse(raw).unwrap() {
            DetectorEndpoint::Http(url) => url,
            other => panic!("unexpected endpoint {:?}", other),
        }
    }

    #[test]
    fn parses_stub_endpoint() {
        assert_eq!(
            DetectorEndpoint::parse("stub://dummy").unwrap(),
            DetectorEndpoint::Stub("dummy".into())
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(DetectorEndpoint::parse("ftp://host").is_err());
        assert!(DetectorEndpoint::parse("not a url").is_err());
    }

    #[test]
    fn image_url_carries_query() {
        let params = InferenceParameters {
            include_classes: vec!["person".into(), "cat".into()],
            ..Default::default()
        };
        let url = image_url(&base("http://localhost:8000"), &params).unwrap();
        assert_eq!(url.path(), "/api/v1/infer/image");
        let query = url.query().unwrap();
        assert!(query.contains("conf=0.25"));
        assert!(query.contains("max_results=100"));
        assert!(query.contains("include_classes=person%2Ccat"));
        assert!(!query.contains("min_area_ratio"));
    }

    #[test]
    fn stream_url_switches_scheme() {
        let params = InferenceParameters::default();
        let ws = stream_url(&base("http://localhost:8000"), &params).unwrap();
        assert_eq!(ws.scheme(), "ws");
        assert_eq!(ws.path(), "/api/v1/infer/stream");
        let wss = stream_url(&base("https://detector.local/prefix"), &params).unwrap();
        assert_eq!(wss.scheme(), "wss");
        assert_eq!(wss.path(), "/prefix/api/v1/infer/stream");
    }

    #[test]
    fn health_url_is_unversioned() {
        let url = health_url(&base("http://localhost:8000")).unwrap();
        assert_eq!(url.path(), "/api/health");
    }
}
