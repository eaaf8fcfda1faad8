//! Compute device selection

use candle_core::Device;
use tracing::info;

use crate::error::{Error, Result};

/// Pick the best available device: CUDA, then Metal, then CPU.
pub fn select_device() -> Result<Device> {
    if candle_core::utils::cuda_is_available() {
        let device =
            Device::new_cuda(0).map_err(|e| Error::ModelLoadError(e.to_string()))?;
        info!("Using CUDA device for inference");
        return Ok(device);
    }
    if candle_core::utils::metal_is_available() {
        let device =
            Device::new_metal(0).map_err(|e| Error::ModelLoadError(e.to_string()))?;
        info!("Using Metal device for inference");
        return Ok(device);
    }
    info!("Falling back to CPU for inference");
    Ok(Device::Cpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_cpu_without_accelerator() {
        let device = select_device().unwrap();
        if !candle_core::utils::cuda_is_available()
            && !candle_core::utils::metal_is_available()
        {
            assert!(device.is_cpu());
        }
    }
}
