use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::{DEFAULT_BAUD, SUPPORTED_BAUD_RATES};

const DEFAULT_ENDPOINT: &str = "https://detect.roboflow.com";
const DEFAULT_MODEL_ID: &str = "garbage-classification-3/2";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyACM0";
const DEFAULT_SNAPSHOT_PATH: &str = "preview.jpg";

/// Lower bound on the post-inference delay.
pub const MIN_THROTTLE: Duration = Duration::from_millis(1000);

#[derive(Debug, Deserialize, Default)]
struct RelayConfigFile {
    inference: Option<InferenceConfigFile>,
    camera: Option<CameraConfigFile>,
    serial: Option<SerialConfigFile>,
    preview: Option<PreviewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct InferenceConfigFile {
    endpoint: Option<String>,
    api_key: Option<String>,
    model_id: Option<String>,
    timeout_secs: Option<u64>,
    jpeg_quality: Option<u8>,
    throttle_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SerialConfigFile {
    device: Option<String>,
    baud: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    mode: Option<String>,
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub inference: InferenceSettings,
    pub camera: CameraSettings,
    pub serial: SerialSettings,
    pub preview: PreviewSettings,
}

#[derive(Clone)]
pub struct InferenceSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub timeout: Duration,
    pub jpeg_quality: u8,
    pub throttle: Duration,
}

impl std::fmt::Debug for InferenceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("timeout", &self.timeout)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("throttle", &self.throttle)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub device: String,
    pub baud: u32,
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub mode: PreviewMode,
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    Headless,
    Snapshot,
    Window,
}

impl FromStr for PreviewMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "headless" | "none" => Ok(Self::Headless),
            "snapshot" => Ok(Self::Snapshot),
            "window" => Ok(Self::Window),
            other => Err(anyhow!(
                "unknown preview mode '{}'; expected headless, snapshot or window",
                other
            )),
        }
    }
}

impl RelayConfig {
    /// Defaults, then the file named by `RELAY_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RELAY_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like [`load`](Self::load) with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RelayConfigFile) -> Result<Self> {
        let inference = file.inference.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let serial = file.serial.unwrap_or_default();
        let preview = file.preview.unwrap_or_default();

        let preview_mode = match preview.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => PreviewMode::Headless,
        };

        Ok(Self {
            inference: InferenceSettings {
                endpoint: inference
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                api_key: inference.api_key.unwrap_or_default(),
                model_id: inference
                    .model_id
                    .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
                timeout: Duration::from_secs(
                    inference.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                ),
                jpeg_quality: inference.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
                throttle: inference
                    .throttle_ms
                    .map(Duration::from_millis)
                    .unwrap_or(MIN_THROTTLE),
            },
            camera: CameraSettings {
                device: camera
                    .device
                    .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            },
            serial: SerialSettings {
                device: serial
                    .device
                    .unwrap_or_else(|| DEFAULT_SERIAL_DEVICE.to_string()),
                baud: serial.baud.unwrap_or(DEFAULT_BAUD),
            },
            preview: PreviewSettings {
                mode: preview_mode,
                snapshot_path: preview
                    .snapshot_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(endpoint) = non_empty_env("RELAY_ENDPOINT") {
            self.inference.endpoint = endpoint;
        }
        if let Some(api_key) = non_empty_env("RELAY_API_KEY") {
            self.inference.api_key = api_key;
        }
        if let Some(model_id) = non_empty_env("RELAY_MODEL_ID") {
            self.inference.model_id = model_id;
        }
        if let Some(timeout) = non_empty_env("RELAY_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("RELAY_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.inference.timeout = Duration::from_secs(seconds);
        }
        if let Some(throttle) = non_empty_env("RELAY_THROTTLE_MS") {
            let millis: u64 = throttle.parse().map_err(|_| {
                anyhow!("RELAY_THROTTLE_MS must be an integer number of milliseconds")
            })?;
            self.inference.throttle = Duration::from_millis(millis);
        }
        if let Some(device) = non_empty_env("RELAY_CAMERA_DEVICE") {
            self.camera.device = device;
        }
        if let Some(device) = non_empty_env("RELAY_SERIAL_DEVICE") {
            self.serial.device = device;
        }
        if let Some(baud) = non_empty_env("RELAY_SERIAL_BAUD") {
            self.serial.baud = baud
                .parse()
                .map_err(|_| anyhow!("RELAY_SERIAL_BAUD must be an integer baud rate"))?;
        }
        if let Some(mode) = non_empty_env("RELAY_PREVIEW") {
            self.preview.mode = mode.parse()?;
        }
        Ok(())
    }

    /// Check cross-field constraints. Call again after applying CLI overrides.
    pub fn validate(&mut self) -> Result<()> {
        self.inference.api_key = self.inference.api_key.trim().to_string();
        if self.inference.api_key.is_empty() {
            return Err(anyhow!(
                "inference api key is required (inference.api_key or RELAY_API_KEY)"
            ));
        }
        self.inference.model_id = self.inference.model_id.trim_matches('/').to_string();
        if self.inference.model_id.is_empty() {
            return Err(anyhow!("inference model id must not be empty"));
        }
        crate::infer::classify_url(
            &self.inference.endpoint,
            &self.inference.model_id,
            &self.inference.api_key,
        )?;
        if self.inference.throttle < MIN_THROTTLE {
            return Err(anyhow!(
                "inference throttle must be at least {} ms",
                MIN_THROTTLE.as_millis()
            ));
        }
        if self.inference.timeout.is_zero() {
            return Err(anyhow!("inference timeout must be greater than zero"));
        }
        if !(1..=100).contains(&self.inference.jpeg_quality) {
            return Err(anyhow!("jpeg quality must be within 1..=100"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud) {
            return Err(anyhow!(
                "unsupported serial baud rate {}; supported: {:?}",
                self.serial.baud,
                SUPPORTED_BAUD_RATES
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<RelayConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
