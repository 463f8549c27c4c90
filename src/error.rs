//! Error types for mandala.
//!
//! This module provides error types for GPU initialization, render target
//! allocation, configuration loading and running the frame loop.

use std::fmt;

/// Errors that can occur in the GPU render façade.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to acquire or present a surface frame.
    Surface(wgpu::SurfaceError),
    /// Failed to allocate the off-screen (supersampled) render target.
    RenderTarget {
        /// Requested supersampling factor.
        factor: u32,
        /// Requested target width in pixels.
        width: u32,
        /// Requested target height in pixels.
        height: u32,
        /// Why the allocation was refused.
        reason: String,
    },
    /// The particle attribute buffer does not fit in one storage binding.
    ParticleBuffer {
        particles: u64,
        bytes: u64,
        reason: String,
    },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::Surface(e) => write!(f, "Surface error: {}", e),
            GpuError::RenderTarget { factor, width, height, reason } => write!(
                f,
                "Failed to allocate SSAA={} render target ({}x{}): {}",
                factor, width, height, reason
            ),
            GpuError::ParticleBuffer { particles, bytes, reason } => write!(
                f,
                "Failed to allocate render buffer for {} particles ({} bytes): {}",
                particles, bytes, reason
            ),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::SurfaceError> for GpuError {
    fn from(e: wgpu::SurfaceError) -> Self {
        GpuError::Surface(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur while loading or saving a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read or write the file.
    Io(std::io::Error),
    /// The file is not valid configuration JSON.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Errors that can occur when running the mandala.
#[derive(Debug)]
pub enum MandalaError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Could not allocate the orbiter population or its render buffer.
    Allocation {
        /// Requested number of orbiters.
        count: usize,
    },
    /// Failed to build the worker pool.
    WorkerPool(rayon::ThreadPoolBuildError),
    /// Failed to open or write the telemetry log.
    Telemetry(std::io::Error),
    /// Failed to load the configuration file.
    Config(ConfigError),
}

impl fmt::Display for MandalaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MandalaError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            MandalaError::Window(e) => write!(f, "Failed to create window: {}", e),
            MandalaError::Gpu(e) => write!(f, "GPU error: {}", e),
            MandalaError::Allocation { count } => {
                write!(f, "Out of memory allocating {} orbiters", count)
            }
            MandalaError::WorkerPool(e) => write!(f, "Failed to build worker pool: {}", e),
            MandalaError::Telemetry(e) => write!(f, "Telemetry log error: {}", e),
            MandalaError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for MandalaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MandalaError::EventLoop(e) => Some(e),
            MandalaError::Window(e) => Some(e),
            MandalaError::Gpu(e) => Some(e),
            MandalaError::Allocation { .. } => None,
            MandalaError::WorkerPool(e) => Some(e),
            MandalaError::Telemetry(e) => Some(e),
            MandalaError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for MandalaError {
    fn from(e: winit::error::EventLoopError) -> Self {
        MandalaError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for MandalaError {
    fn from(e: winit::error::OsError) -> Self {
        MandalaError::Window(e)
    }
}

impl From<GpuError> for MandalaError {
    fn from(e: GpuError) -> Self {
        MandalaError::Gpu(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for MandalaError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        MandalaError::WorkerPool(e)
    }
}

impl From<ConfigError> for MandalaError {
    fn from(e: ConfigError) -> Self {
        MandalaError::Config(e)
    }
}
