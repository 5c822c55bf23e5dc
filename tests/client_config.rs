use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use swift_detect::config::ClientConfig;
use swift_detect::DetectorEndpoint;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SWIFTDETECT_CONFIG",
        "SWIFTDETECT_ENDPOINT",
        "SWIFTDETECT_CONF",
        "SWIFTDETECT_IOU",
        "SWIFTDETECT_MAX_RESULTS",
        "SWIFTDETECT_CLASSES",
        "SWIFTDETECT_MIN_AREA_RATIO",
        "SWIFTDETECT_SMOOTHING",
        "SWIFTDETECT_SOURCE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ClientConfig::load().expect("load config");
    assert_eq!(cfg.params.confidence, 0.25);
    assert_eq!(cfg.params.iou, 0.45);
    assert_eq!(cfg.params.max_results, 100);
    assert!(cfg.params.include_classes.is_empty());
    assert_eq!(cfg.params.min_area_ratio, None);
    assert!(!cfg.smoothing);
    assert_eq!(cfg.source.uri, "stub://camera");
    assert!(matches!(
        cfg.detector_endpoint().unwrap(),
        DetectorEndpoint::Http(_)
    ));
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "endpoint": "http://detector.local:8000",
        "smoothing": true,
        "inference": {
            "conf": 0.4,
            "iou": 0.5,
            "max_results": 20,
            "classes": ["person", "car"],
            "min_area_ratio": 0.01
        },
        "source": {
            "uri": "http://camera.local/snapshot.jpg",
            "width": 1280,
            "height": 720
        },
        "encoding": {
            "stream_quality": 50,
            "request_quality": 90
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("SWIFTDETECT_CONFIG", file.path());
    std::env::set_var("SWIFTDETECT_CONF", "0.6");
    std::env::set_var("SWIFTDETECT_CLASSES", "dog, cat");
    std::env::set_var("SWIFTDETECT_SMOOTHING", "off");

    let cfg = ClientConfig::load().expect("load config");

    assert_eq!(cfg.endpoint, "http://detector.local:8000");
    assert_eq!(cfg.params.confidence, 0.6);
    assert_eq!(cfg.params.iou, 0.5);
    assert_eq!(cfg.params.max_results, 20);
    assert_eq!(cfg.params.include_classes, vec!["dog", "cat"]);
    assert_eq!(cfg.params.min_area_ratio, Some(0.01));
    assert!(!cfg.smoothing);
    assert_eq!(cfg.source.uri, "http://camera.local/snapshot.jpg");
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.stream_quality, 50);
    assert_eq!(cfg.request_quality, 90);

    clear_env();
}

#[test]
fn loads_toml_file_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
endpoint = "stub://bench"

[inference]
max_results = 5
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("SWIFTDETECT_CONFIG", file.path());
    std::env::set_var("SWIFTDETECT_SOURCE", "stub://bench_cam");

    let cfg = ClientConfig::load().expect("load config");
    assert_eq!(cfg.params.max_results, 5);
    assert_eq!(cfg.source.uri, "stub://bench_cam");
    assert_eq!(
        cfg.detector_endpoint().unwrap(),
        DetectorEndpoint::Stub("bench".into())
    );

    clear_env();
}

#[test]
fn rejects_out_of_range_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SWIFTDETECT_IOU", "1.5");
    assert!(ClientConfig::load().is_err());
    clear_env();

    std::env::set_var("SWIFTDETECT_MAX_RESULTS", "0");
    assert!(ClientConfig::load().is_err());
    clear_env();

    std::env::set_var("SWIFTDETECT_CONF", "high");
    assert!(ClientConfig::load().is_err());
    clear_env();

    std::env::set_var("SWIFTDETECT_ENDPOINT", "ftp://detector");
    assert!(ClientConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    std::env::set_var("SWIFTDETECT_CONFIG", file.path());
    assert!(ClientConfig::load().is_err());

    clear_env();
}
