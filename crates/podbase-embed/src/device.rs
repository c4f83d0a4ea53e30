use candle_core::Device;

/// Pick the compute device: Metal when the feature is enabled and the
/// hardware cooperates, CPU otherwise. Batch hosts default to CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            println!("🚀 Device: Metal (MPS)");
            return dev;
        }
    }
    println!("🖥️  Device: CPU");
    Device::Cpu
}
