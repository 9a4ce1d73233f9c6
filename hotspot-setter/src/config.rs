use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::network::BackendKind;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub crop: CropConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CropConfig {
    pub width: u32,
    pub height: u32,
    /// Pixels moved per directional nudge.
    pub step: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub backend: BackendKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub env_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe_address: String,
    pub timeout_secs: f64,
    /// Hide the saved-image gallery while offline.
    pub gate_gallery: bool,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            step: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let pictures = dirs::picture_dir().unwrap_or_else(|| home.clone());
        Self {
            output_dir: pictures.join("hotspot-crops"),
            env_file: home.join(".hotspot-setter").join(".env"),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_address: "8.8.8.8:53".to_string(),
            timeout_secs: 3.0,
            gate_gallery: true,
        }
    }
}

impl ConnectivityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::from_secs(3))
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hotspot-setter")
            .join("config.toml")
    }

    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(_) => {
                // Create default config if not found
                let config = Self::default();
                if let Some(parent) = path.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                let _ = fs::write(path, toml::to_string_pretty(&config)?);
                tracing::info!("Wrote default config to {}", path.display());
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.crop, CropConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[crop]\nwidth = 320\n\n[network]\nbackend = \"netsh\"\n\n[storage]\noutput_dir = \"/tmp/crops\"\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.crop.width, 320);
        assert_eq!(config.crop.height, 200);
        assert_eq!(config.crop.step, 10);
        assert_eq!(config.network.backend, BackendKind::Netsh);
        assert_eq!(config.storage.output_dir, PathBuf::from("/tmp/crops"));
        assert_eq!(config.connectivity.probe_address, "8.8.8.8:53");
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[crop]\nwidth = \"wide\"\n").unwrap();

        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn bad_timeout_falls_back() {
        let connectivity = ConnectivityConfig {
            timeout_secs: -1.0,
            ..Default::default()
        };
        assert_eq!(connectivity.timeout(), Duration::from_secs(3));
    }
}
