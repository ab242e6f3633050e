use lensing::{Environment, SceneSettings, SharedParameters};

/// Anti-aliasing policy for the scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the offscreen formats.
    #[default]
    Auto,
    /// Render the scene pass single-sampled.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Adapter power preference forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Summary of the adapter picked at start-up.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// CPU rasterisers (llvmpipe, WARP, SwiftShader) report as `Cpu`; some
    /// only reveal themselves by name.
    pub fn is_software(&self) -> bool {
        if matches!(self.device_type, wgpu::DeviceType::Cpu) {
            return true;
        }
        let name = self.name.to_ascii_lowercase();
        ["llvmpipe", "softpipe", "swiftshader", "lavapipe", "warp"]
            .iter()
            .any(|needle| name.contains(needle))
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub window_size: (u32, u32),
    pub title: String,
    /// Optional FPS cap; `None` renders on every display refresh.
    pub target_fps: Option<f32>,
    pub antialiasing: Antialiasing,
    pub vsync: bool,
    pub power: GpuPowerPreference,
    pub environment: Environment,
    pub scene: SceneSettings,
    /// Parameter cell written by the host and read once per frame.
    pub parameters: SharedParameters,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            title: "chronolens".into(),
            target_fps: None,
            antialiasing: Antialiasing::default(),
            vsync: true,
            power: GpuPowerPreference::default(),
            environment: Environment::default(),
            scene: SceneSettings::default(),
            parameters: SharedParameters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: name.into(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn detects_software_adapters() {
        assert!(profile("llvmpipe (LLVM 17.0.6, 256 bits)", wgpu::DeviceType::Other).is_software());
        assert!(profile("anything", wgpu::DeviceType::Cpu).is_software());
        assert!(!profile("AMD Radeon RX 7800 XT", wgpu::DeviceType::DiscreteGpu).is_software());
    }
}
