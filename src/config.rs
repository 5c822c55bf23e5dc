use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detect::{InferenceParameters, DEFAULT_CONFIDENCE, DEFAULT_MAX_RESULTS, DEFAULT_NMS_IOU};
use crate::frame::{REQUEST_JPEG_QUALITY, STREAM_JPEG_QUALITY};
use crate::ingest::{SourceConfig, DEFAULT_HEIGHT, DEFAULT_SOURCE_URI, DEFAULT_WIDTH};
use crate::transport::DetectorEndpoint;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/";

#[derive(Debug, Deserialize, Default)]
struct ClientConfigFile {
    endpoint: Option<String>,
    smoothing: Option<bool>,
    inference: Option<InferenceConfigFile>,
    source: Option<SourceConfigFile>,
    encoding: Option<EncodingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct InferenceConfigFile {
    conf: Option<f32>,
    iou: Option<f32>,
    max_results: Option<u32>,
    classes: Option<Vec<String>>,
    min_area_ratio: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct EncodingConfigFile {
    stream_quality: Option<u8>,
    request_quality: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Detector base URL or `stub://<name>`.
    pub endpoint: String,
    pub params: InferenceParameters,
    pub smoothing: bool,
    pub source: SourceConfig,
    pub stream_quality: u8,
    pub request_quality: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        // Defaults never fail to build.
        Self::from_file(ClientConfigFile::default())
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SWIFTDETECT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parsed detector endpoint.
    pub fn detector_endpoint(&self) -> Result<DetectorEndpoint> {
        DetectorEndpoint::parse(&self.endpoint)
    }

    fn from_file(file: ClientConfigFile) -> Self {
        let inference = file.inference.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        let encoding = file.encoding.unwrap_or_default();
        Self {
            endpoint: file
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            params: InferenceParameters {
                confidence: inference.conf.unwrap_or(DEFAULT_CONFIDENCE),
                iou: inference.iou.unwrap_or(DEFAULT_NMS_IOU),
                max_results: inference.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
                include_classes: inference.classes.unwrap_or_default(),
                min_area_ratio: inference.min_area_ratio,
            },
            smoothing: file.smoothing.unwrap_or(false),
            source: SourceConfig {
                uri: source.uri.unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
                width: source.width.unwrap_or(DEFAULT_WIDTH),
                height: source.height.unwrap_or(DEFAULT_HEIGHT),
            },
            stream_quality: encoding.stream_quality.unwrap_or(STREAM_JPEG_QUALITY),
            request_quality: encoding.request_quality.unwrap_or(REQUEST_JPEG_QUALITY),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("SWIFTDETECT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint.trim().to_string();
            }
        }
        if let Some(conf) = env_parse::<f32>("SWIFTDETECT_CONF")? {
            self.params.confidence = conf;
        }
        if let Some(iou) = env_parse::<f32>("SWIFTDETECT_IOU")? {
            self.params.iou = iou;
        }
        if let Some(max_results) = env_parse::<u32>("SWIFTDETECT_MAX_RESULTS")? {
            self.params.max_results = max_results;
        }
        if let Ok(classes) = std::env::var("SWIFTDETECT_CLASSES") {
            self.params.include_classes = split_csv(&classes);
        }
        if let Some(ratio) = env_parse::<f32>("SWIFTDETECT_MIN_AREA_RATIO")? {
            self.params.min_area_ratio = Some(ratio);
        }
        if let Ok(smoothing) = std::env::var("SWIFTDETECT_SMOOTHING") {
            self.smoothing = parse_bool(&smoothing).ok_or_else(|| {
                anyhow!("SWIFTDETECT_SMOOTHING must be one of true/false/1/0/on/off")
            })?;
        }
        if let Ok(source) = std::env::var("SWIFTDETECT_SOURCE") {
            if !source.trim().is_empty() {
                self.source.uri = source.trim().to_string();
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.params.validate()?;
        for (name, quality) in [
            ("stream_quality", self.stream_quality),
            ("request_quality", self.request_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(anyhow!("{} must be within 1..=100, got {}", name, quality));
            }
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        self.detector_endpoint()?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ClientConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value: {}", key, value)),
        _ => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_detector_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.params, InferenceParameters::default());
        assert!(!cfg.smoothing);
        assert_eq!(cfg.stream_quality, 60);
        assert_eq!(cfg.request_quality, 80);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn split_csv_skips_blanks() {
        assert_eq!(split_csv(" person, ,car,"), vec!["person", "car"]);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn rejects_bad_quality_and_scheme() {
        let mut cfg = ClientConfig::default();
        cfg.request_quality = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ClientConfig::default();
        cfg.endpoint = "ftp://detector".into();
        assert!(cfg.validate().is_err());
    }
}
