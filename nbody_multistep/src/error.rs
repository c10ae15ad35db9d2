use std::path::PathBuf;

/// Errors raised while preparing or running a simulation.
///
/// None of these are retried. Arithmetic errors point at a badly constructed scenario, every other
/// variant aborts the run it was raised in.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A vector division by a zero component, or two bodies sharing the exact same position.
    #[error("division by zero")]
    DivisionByZero,

    /// The run configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No adapter could be found to create a compute device on.
    #[error("no compute adapter available")]
    NoAdapter,

    /// The adapter found cannot run double-precision kernels.
    #[error("adapter `{0}` does not support 64-bit floats in shaders")]
    MissingF64Support(String),

    /// The device request was rejected by the adapter.
    #[cfg(feature = "gpu")]
    #[error("failed to create compute device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// The kernel source override directory does not exist.
    #[error("kernel source directory does not exist: {}", .0.display())]
    MissingKernelSource(PathBuf),

    /// Kernel compilation failed. `log` holds the build log reported by the device.
    #[error("failed to build kernel `{entry_point}`:\n{log}")]
    KernelBuild {
        /// Entry point that failed to build.
        entry_point: String,
        /// Diagnostic text reported by the device.
        log: String,
    },

    /// The requested entry point is not part of the kernel catalogue.
    #[error("unknown kernel entry point `{0}`")]
    UnknownKernel(String),

    /// A kernel argument was missing or of the wrong kind when binding or enqueueing.
    #[error("argument {index} of kernel `{kernel}`: {reason}")]
    Argument {
        /// Entry point of the kernel.
        kernel: &'static str,
        /// Argument index.
        index: u32,
        /// What went wrong.
        reason: String,
    },

    /// A handle that was never returned by the device it is used with.
    #[error("unknown buffer handle {0}")]
    UnknownBuffer(usize),

    /// Reading a buffer back from the device failed.
    #[error("failed to read back buffer: {0}")]
    ReadBack(String),

    /// Host data does not fit the buffer it is written to.
    #[error("failed to write buffer: {0}")]
    Write(String),

    /// Writing a trajectory row failed.
    #[error("trajectory sink: {0}")]
    Sink(#[from] csv::Error),

    /// Reading configuration or kernel files failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
