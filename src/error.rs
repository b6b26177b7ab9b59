use thiserror::Error;

/// A configuration value that cannot be used to start the simulation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value}")]
    NotPositive { name: &'static str, value: u32 },
    #[error("could not parse {name}={value:?}: {reason}")]
    Parse {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures while bringing up the device, buffers or pipelines.
///
/// All of these are fatal: the render loop never starts once one is returned.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to acquire device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("adapter does not support {0}")]
    MissingCapability(&'static str),
    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,
    #[error("buffer `{label}` needs {size} bytes but the device allows at most {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },
    #[error("work group of {size}x{size} exceeds the device limit ({limit})")]
    WorkGroupTooLarge { size: u32, limit: u32 },
    #[error("failed to load shader source {path:?}: {source}")]
    ShaderSource {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shader `{label}` failed to compile:\n{message}")]
    ShaderCompilation { label: &'static str, message: String },
}

/// Failures while running frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Acquiring the draw target failed. Some variants are recoverable.
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
    /// The device is gone; no further frame can run.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),
}
