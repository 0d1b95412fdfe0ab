use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE_VAR: &str = "WASTE_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub model: ModelSettings,
    pub actuator: ActuatorSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest request body accepted by either route.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub upload_dir: PathBuf,
    pub file_name: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("upload"),
            file_name: "received_image.jpg".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, what Keras exports produce.
    Nhwc,
    /// `[1, 3, H, W]`
    Nchw,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub input_size: u32,
    pub layout: TensorLayout,
    pub apply_softmax: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/waste_classifier.onnx"),
            input_size: 224,
            layout: TensorLayout::Nhwc,
            apply_softmax: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ActuatorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.209.98".to_owned(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl Settings {
    /// Defaults, then the config file, then `WASTE_*` environment variables.
    ///
    /// Nested keys use a double underscore, e.g. `WASTE_SERVER__PORT=8080`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        Config::builder()
            .add_source(File::from(path.as_path()).required(false))
            .add_source(
                Environment::with_prefix("WASTE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_FILE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
