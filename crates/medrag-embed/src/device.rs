use candle_core::Device;
use tracing::{info, warn};

/// Device by name (`cpu`, `metal`, `cuda`). Accelerators that are not
/// compiled in or not present fall back to the CPU.
pub fn select_device(name: &str) -> Device {
    let requested = name.trim().to_ascii_lowercase();
    let attempt = match requested.as_str() {
        "metal" | "mps" => Some(Device::new_metal(0)),
        "cuda" | "gpu" => Some(Device::new_cuda(0)),
        _ => None,
    };
    match attempt {
        Some(Ok(dev)) => {
            info!(device = %requested, "embedding device");
            dev
        }
        Some(Err(e)) => {
            warn!(device = %requested, error = %e, "accelerator unavailable, using CPU");
            Device::Cpu
        }
        None => {
            info!(device = "cpu", "embedding device");
            Device::Cpu
        }
    }
}
