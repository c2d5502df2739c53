use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use classify_relay::config::RelayConfig;
use classify_relay::PreviewMode;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "RELAY_CONFIG",
        "RELAY_ENDPOINT",
        "RELAY_API_KEY",
        "RELAY_MODEL_ID",
        "RELAY_TIMEOUT_SECS",
        "RELAY_THROTTLE_MS",
        "RELAY_CAMERA_DEVICE",
        "RELAY_SERIAL_DEVICE",
        "RELAY_SERIAL_BAUD",
        "RELAY_PREVIEW",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "inference": {
            "endpoint": "https://classify.example.net/",
            "api_key": "file-key",
            "model_id": "/sorting-line/4/",
            "timeout_secs": 12,
            "throttle_ms": 2500
        },
        "camera": {
            "device": "/dev/video2",
            "width": 1280,
            "height": 720,
            "target_fps": 15
        },
        "serial": {
            "device": "/dev/ttyUSB0",
            "baud": 9600
        },
        "preview": {
            "mode": "snapshot",
            "snapshot_path": "/tmp/relay-preview.jpg"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("RELAY_CONFIG", file.path());
    std::env::set_var("RELAY_API_KEY", "env-key");
    std::env::set_var("RELAY_SERIAL_DEVICE", "stub://bench");

    let cfg = RelayConfig::load().expect("load config");

    assert_eq!(cfg.inference.endpoint, "https://classify.example.net/");
    assert_eq!(cfg.inference.api_key, "env-key");
    assert_eq!(cfg.inference.model_id, "sorting-line/4");
    assert_eq!(cfg.inference.timeout, Duration::from_secs(12));
    assert_eq!(cfg.inference.throttle, Duration::from_millis(2500));
    assert_eq!(cfg.camera.device, "/dev/video2");
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 720);
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!(cfg.serial.device, "stub://bench");
    assert_eq!(cfg.serial.baud, 9600);
    assert_eq!(cfg.preview.mode, PreviewMode::Snapshot);
    assert_eq!(
        cfg.preview.snapshot_path,
        std::path::PathBuf::from("/tmp/relay-preview.jpg")
    );

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[inference]
api_key = "toml-key"
model_id = "garbage-classification-3/2"

[serial]
device = "/dev/ttyACM1"
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = RelayConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.inference.api_key, "toml-key");
    assert_eq!(cfg.serial.device, "/dev/ttyACM1");
    assert_eq!(cfg.serial.baud, 115_200);
    assert_eq!(cfg.inference.throttle, Duration::from_secs(1));

    clear_env();
}

#[test]
fn env_only_config_needs_an_api_key() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let err = RelayConfig::load().unwrap_err();
    assert!(err.to_string().contains("api key"));

    std::env::set_var("RELAY_API_KEY", "env-key");
    std::env::set_var("RELAY_PREVIEW", "none");
    let cfg = RelayConfig::load().expect("load config");
    assert_eq!(cfg.preview.mode, PreviewMode::Headless);

    clear_env();
}

#[test]
fn rejects_sub_second_throttle_and_bad_baud() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("RELAY_API_KEY", "env-key");

    std::env::set_var("RELAY_THROTTLE_MS", "250");
    assert!(RelayConfig::load().is_err());
    std::env::remove_var("RELAY_THROTTLE_MS");

    std::env::set_var("RELAY_SERIAL_BAUD", "12345");
    assert!(RelayConfig::load().is_err());
    std::env::set_var("RELAY_SERIAL_BAUD", "fast");
    assert!(RelayConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_unreadable_and_malformed_files() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("RELAY_API_KEY", "env-key");

    let missing = std::path::Path::new("/nonexistent/relay.json");
    assert!(RelayConfig::load_from(Some(missing)).is_err());

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ not json").expect("write config");
    let err = RelayConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}
