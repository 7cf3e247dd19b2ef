use crate::core::{DashboardError, ModelOptions, Result};
use candle_core::Device;

/// Request for a specific device, used by pipeline builders.
#[derive(Clone, Default)]
pub enum DeviceRequest {
    /// Use CUDA device 0 if available, otherwise CPU.
    #[default]
    Default,
    /// Force CPU even if CUDA is available.
    Cpu,
    /// Select a specific CUDA device by index.
    Cuda(usize),
}

impl DeviceRequest {
    /// Resolve the request into an actual [`Device`].
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Default => Device::cuda_if_available(0)
                .map_err(|e| DashboardError::Device(e.to_string())),
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => {
                Device::new_cuda(i).map_err(|e| DashboardError::Device(format!("cuda:{i}: {e}")))
            }
        }
    }
}

/// Utility to generate a cache key combining model options and device location.
pub fn build_cache_key<O: ModelOptions>(options: &O, device: &Device) -> String {
    format!("{}-{:?}", options.cache_key(), device.location())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Options(&'static str);

    impl ModelOptions for Options {
        fn cache_key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn cpu_request_resolves_to_cpu() {
        let device = DeviceRequest::Cpu.resolve().unwrap();
        assert!(device.is_cpu());
    }

    #[test]
    fn cache_key_includes_device() {
        let key = build_cache_key(&Options("clapAI/model@main"), &Device::Cpu);
        assert!(key.starts_with("clapAI/model@main-"));
        assert!(key.contains("Cpu"));
    }
}
