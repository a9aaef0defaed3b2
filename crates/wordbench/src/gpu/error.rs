use std::fmt;

/// A step of the device dispatch pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Find a compute device.
    Discover,
    /// Create a context bound to the device.
    Context,
    /// Create a command queue on the context.
    Queue,
    /// Compile the kernel source.
    Compile,
    /// Look up the kernel entry point in the compiled program.
    Kernel,
    /// Allocate and fill an input buffer.
    Upload,
    /// Allocate the zeroed result accumulator.
    ResultBuffer,
    /// Bind arguments and enqueue the kernel.
    Launch,
    /// Wait for completion and read the result back.
    Readback,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Self; 9] = [
        Self::Discover,
        Self::Context,
        Self::Queue,
        Self::Compile,
        Self::Kernel,
        Self::Upload,
        Self::ResultBuffer,
        Self::Launch,
        Self::Readback,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discover => "device discovery",
            Self::Context => "context creation",
            Self::Queue => "command queue creation",
            Self::Compile => "kernel compilation",
            Self::Kernel => "kernel creation",
            Self::Upload => "buffer upload",
            Self::ResultBuffer => "result buffer allocation",
            Self::Launch => "kernel launch",
            Self::Readback => "result readback",
        };
        f.pad(s)
    }
}

/// Error type for compute device failures.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DeviceError {
    /// No compute device is available.
    #[error("no compute device found")]
    #[diagnostic(
        code(wordbench::gpu::no_device),
        help("install an OpenCL driver for your GPU, or pass --device host to emulate the kernel")
    )]
    NoDevice,

    /// This build has no backend for the requested device.
    #[error("OpenCL support is not compiled in")]
    #[diagnostic(
        code(wordbench::gpu::unsupported),
        help("rebuild with `--features opencl`, or pass --device host to emulate the kernel")
    )]
    Unsupported,

    /// The kernel source failed to compile for the device.
    #[error("kernel compilation failed:\n{log}")]
    #[diagnostic(code(wordbench::gpu::compile))]
    Compile {
        /// Build log reported by the device compiler.
        log: String,
    },

    /// Global/local work sizes are unusable.
    #[error("invalid work sizes: global {global}, local {local}")]
    #[diagnostic(
        code(wordbench::gpu::invalid_launch),
        help("the global size must be a non-zero multiple of the local size")
    )]
    InvalidLaunch {
        /// Requested global work size.
        global: usize,
        /// Requested work-group size.
        local: usize,
    },

    /// A pipeline stage failed.
    #[error("{stage} failed: {message}")]
    #[diagnostic(code(wordbench::gpu::stage))]
    Stage {
        /// The stage that failed.
        stage: Stage,
        /// Driver-reported detail.
        message: String,
    },
}

impl DeviceError {
    /// Shorthand for [`DeviceError::Stage`].
    pub fn at(stage: Stage, message: impl fmt::Display) -> Self {
        Self::Stage {
            stage,
            message: message.to_string(),
        }
    }
}
