use super::error::{DashboardError, Result};
use crate::pipelines::utils::DeviceRequest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_MODEL_ID: &str = "clapAI/modernBERT-base-multilingual-sentiment";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Runtime settings for the dashboard. Every field has a default so an empty YAML file
/// (or no file at all) is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Hugging Face repository holding the sentiment model.
    pub model_id: String,
    pub revision: String,
    /// `auto`, `cpu` or `cuda:N`.
    pub device: String,
    pub bind: String,
    /// Rows shown in the CSV upload preview.
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: "main".to_string(),
            device: "auto".to_string(),
            bind: DEFAULT_BIND.to_string(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl DashboardConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|e| {
            DashboardError::Config(format!("reading {}: {e}", path_ref.display()))
        })?;
        Self::from_yaml(&contents)
            .map_err(|e| DashboardError::Config(format!("parsing {}: {e}", path_ref.display())))
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    pub fn device_request(&self) -> Result<DeviceRequest> {
        let requested = self.device.trim().to_ascii_lowercase();
        match requested.as_str() {
            "" | "auto" => Ok(DeviceRequest::Default),
            "cpu" => Ok(DeviceRequest::Cpu),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse::<usize>().ok())
                .map(DeviceRequest::Cuda)
                .ok_or_else(|| {
                    DashboardError::Config(format!(
                        "invalid device '{}': expected auto, cpu or cuda:N",
                        self.device
                    ))
                }),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| DashboardError::Config(format!("invalid bind address '{}': {e}", self.bind)))
    }
}
