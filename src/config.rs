//! Configuration management for the rig server
//!
//! This module provides runtime configuration loading from JSON files,
//! covering the HTTP listen address, the optional serial acquisition
//! backend, the export output directory, and the scheduler poll interval.
//! Missing or malformed files fall back to defaults so the server always
//! starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub acquisition: AcquisitionConfig,
    pub export: ExportConfig,
}

/// HTTP server parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Bind on all interfaces so the rig can reach the push endpoint
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Sample acquisition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Serial port to pull samples from; None means push-only (HTTP) mode
    pub serial_port: Option<String>,
    /// Baud rate for the serial port
    pub baud_rate: u32,
    /// Scheduler poll interval in milliseconds; bounds stop latency
    pub poll_interval_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: 115_200,
            poll_interval_ms: 100,
        }
    }
}

/// Export output parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving the per-run CSV files and plot PNG
    pub data_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            data_dir: ".".to_string(),
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            acquisition: AcquisitionConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the default configuration if the file
    /// doesn't exist or contains invalid JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("rig_config.json")
    }
}
