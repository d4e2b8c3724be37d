//! Error types for emberflow.
//!
//! The simulation kernels themselves cannot fail: out-of-range particles are
//! corrected in place and out-of-grid writes are discarded. Everything that
//! can go wrong happens at setup time (a malformed configuration) or at the
//! GPU boundary (adapter, device, buffer mapping).

use std::fmt;

/// A configuration that cannot be simulated.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Width or height is zero.
    ZeroResolution { width: u32, height: u32 },
    /// `width * height` does not fit the `u32` cell index space.
    GridTooLarge { width: u32, height: u32 },
    /// A particle effect was requested with an empty pool.
    EmptyParticlePool,
    /// Neither the heat grid nor a particle effect is enabled.
    NothingToSimulate,
    /// A numeric parameter is non-finite or outside its allowed range.
    InvalidParameter { name: &'static str, value: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroResolution { width, height } => {
                write!(f, "Resolution must be non-zero, got {}x{}", width, height)
            }
            ConfigError::GridTooLarge { width, height } => write!(
                f,
                "Grid of {}x{} cells does not fit a 32-bit cell index",
                width, height
            ),
            ConfigError::EmptyParticlePool => {
                write!(f, "Particle effect needs at least one particle")
            }
            ConfigError::NothingToSimulate => write!(
                f,
                "Enable the heat grid or a particle effect before building a simulation"
            ),
            ConfigError::InvalidParameter { name, value } => {
                write!(f, "Invalid value for `{}`: {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from the GPU backend.
#[derive(Debug)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map a staging buffer for reading.
    BufferMapping(String),
    /// The simulation configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
            GpuError::Config(e) => write!(f, "Invalid simulation config: {}", e),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

impl From<ConfigError> for GpuError {
    fn from(e: ConfigError) -> Self {
        GpuError::Config(e)
    }
}

/// Errors that can occur when writing frames.
#[derive(Debug)]
pub enum OutputError {
    /// Failed to encode or write an image.
    Image(image::ImageError),
    /// Failed to create the output directory.
    Io(std::io::Error),
    /// Pixel buffer does not match the frame size.
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Image(e) => write!(f, "Failed to write image: {}", e),
            OutputError::Io(e) => write!(f, "Failed to prepare output directory: {}", e),
            OutputError::SizeMismatch { expected, actual } => write!(
                f,
                "Frame has {} pixels but the grid has {} cells",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Image(e) => Some(e),
            OutputError::Io(e) => Some(e),
            OutputError::SizeMismatch { .. } => None,
        }
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

impl From<std::io::Error> for OutputError {
    fn from(e: std::io::Error) -> Self {
        OutputError::Io(e)
    }
}

/// Errors that can occur when running a simulation end to end.
#[derive(Debug)]
pub enum SimulationError {
    /// The configuration was rejected.
    Config(ConfigError),
    /// GPU initialization or readback failed.
    Gpu(GpuError),
    /// Writing a frame failed.
    Output(OutputError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "{}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
            SimulationError::Output(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::Output(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

impl From<OutputError> for SimulationError {
    fn from(e: OutputError) -> Self {
        SimulationError::Output(e)
    }
}
