//! Data-parallel match counting on a compute device.
//!
//! The corpus is flattened back into one byte buffer and handed, together
//! with the target bytes, to a sliding-window kernel.  Work-items stride over
//! start offsets and add their local tallies to a single device-side counter
//! with an atomic add.
//!
//! # Pipeline
//!
//! ```text
//! discover ─▶ context ─▶ queue ─▶ compile ─▶ kernel
//!     ─▶ upload text ─▶ upload target ─▶ zeroed result
//!     ─▶ launch ─▶ blocking readback
//! ```
//!
//! Every stage hands back an owned resource that releases itself on drop.
//! [`dispatch`] keeps them as locals in acquisition order, so whichever stage
//! fails, everything acquired before it is released in reverse order before
//! the error reaches the caller.
//!
//! # Matching semantics
//!
//! [`MatchMode::Substring`] counts raw occurrences in the flattened buffer, so
//! `"the"` inside `"other"` counts.  [`MatchMode::WholeWord`] requires the
//! separator or a buffer edge on both sides and, for ASCII targets, agrees with
//! the CPU strategies.  The kernel folds ASCII case only.

mod error;
pub mod host;
#[cfg(feature = "opencl")]
pub mod opencl;

use std::fmt;
use std::path::Path;

pub use error::{DeviceError, Stage};
pub use host::HostBackend;

use crate::corpus::TokenSequence;
use crate::count::{Algorithm, CountError, CountResult, Counter, Target, timed};

/// Kernel source compiled on every dispatch.
pub const KERNEL_SOURCE: &str = include_str!("kernels/count_matches.cl");

/// Entry point inside [`KERNEL_SOURCE`].
pub const KERNEL_NAME: &str = "count_matches";

/// Compiler flags passed with [`KERNEL_SOURCE`].
pub const BUILD_OPTIONS: &str = "-cl-std=CL1.2";

/// How the kernel decides that a window matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Any occurrence in the flattened buffer, even inside a longer token.
    #[default]
    Substring,
    /// Occurrences bounded by the separator or the buffer edge.
    WholeWord,
}

impl MatchMode {
    /// Short CLI key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Substring => "substring",
            Self::WholeWord => "whole-word",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "substring" => Ok(Self::Substring),
            "whole-word" => Ok(Self::WholeWord),
            other => Err(format!(
                "unknown match mode {other:?} (expected substring or whole-word)"
            )),
        }
    }
}

/// Which backend executes the kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceKind {
    /// First OpenCL device on the first platform.
    #[default]
    OpenCl,
    /// Host-side emulation of the kernel.
    Host,
}

impl DeviceKind {
    /// Short CLI key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenCl => "opencl",
            Self::Host => "host",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opencl" => Ok(Self::OpenCl),
            "host" => Ok(Self::Host),
            other => Err(format!(
                "unknown device {other:?} (expected opencl or host)"
            )),
        }
    }
}

/// Global and local work sizes for the kernel launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    global: usize,
    local: usize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            global: 1024,
            local: 64,
        }
    }
}

impl LaunchConfig {
    /// Validate a launch geometry: `global` must be a non-zero multiple of
    /// a non-zero `local`.
    pub fn new(global: usize, local: usize) -> Result<Self, DeviceError> {
        if local == 0 || global == 0 || global % local != 0 {
            return Err(DeviceError::InvalidLaunch { global, local });
        }
        Ok(Self { global, local })
    }

    /// Total number of work-items.
    #[must_use]
    pub fn global(&self) -> usize {
        self.global
    }

    /// Work-items per work-group.
    #[must_use]
    pub fn local(&self) -> usize {
        self.local
    }
}

/// Arguments bound to the kernel, in parameter order.
pub struct KernelArgs<'a, B: Backend + ?Sized> {
    /// Flattened corpus.
    pub text: &'a B::Bytes,
    /// Target bytes.
    pub pattern: &'a B::Bytes,
    /// Zero-initialised accumulator.
    pub result: &'a B::Counter,
    /// Length of `text` in bytes.
    pub text_len: u32,
    /// Length of `pattern` in bytes.
    pub pattern_len: u32,
    /// `1` for [`MatchMode::WholeWord`], `0` otherwise.
    pub whole_word: u32,
}

/// One implementation of the dispatch pipeline.
///
/// Each method performs one [`Stage`].  Every associated type owns a device
/// resource and must release it when dropped.
pub trait Backend {
    /// Selected compute device.
    type Device;
    /// Context bound to the device.
    type Context;
    /// Command queue on the context.
    type Queue;
    /// Compiled program.
    type Program;
    /// Kernel entry point.
    type Kernel;
    /// Read-only byte buffer.
    type Bytes;
    /// Single `u32` accumulator.
    type Counter;

    /// Find a device, or fail with [`DeviceError::NoDevice`].
    fn discover(&self) -> Result<Self::Device, DeviceError>;
    /// Create a context on `device`.
    fn create_context(&self, device: &Self::Device) -> Result<Self::Context, DeviceError>;
    /// Create an in-order command queue.
    fn create_queue(
        &self,
        device: &Self::Device,
        context: &Self::Context,
    ) -> Result<Self::Queue, DeviceError>;
    /// Compile `source` with `options`.
    fn build_program(
        &self,
        context: &Self::Context,
        source: &str,
        options: &str,
    ) -> Result<Self::Program, DeviceError>;
    /// Look up the kernel called `name`.
    fn create_kernel(&self, program: &Self::Program, name: &str)
    -> Result<Self::Kernel, DeviceError>;
    /// Copy `bytes` into a new device buffer.
    fn upload(&self, context: &Self::Context, bytes: &[u8]) -> Result<Self::Bytes, DeviceError>;
    /// Allocate an accumulator initialised to zero.
    fn zeroed_counter(&self, context: &Self::Context) -> Result<Self::Counter, DeviceError>;
    /// Bind `args` and run the kernel over `config`.
    fn launch(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        args: &KernelArgs<'_, Self>,
        config: LaunchConfig,
    ) -> Result<(), DeviceError>;
    /// Block until the queue drains and read the accumulator.
    fn read_counter(
        &self,
        queue: &Self::Queue,
        counter: &Self::Counter,
    ) -> Result<u32, DeviceError>;
}

/// Run the full pipeline on `backend` and return the match count.
pub fn dispatch<B: Backend>(
    backend: &B,
    text: &[u8],
    pattern: &[u8],
    mode: MatchMode,
    config: LaunchConfig,
) -> Result<u64, DeviceError> {
    let text_len =
        u32::try_from(text.len()).map_err(|_| DeviceError::at(Stage::Upload, "corpus exceeds 4 GiB"))?;
    let pattern_len = u32::try_from(pattern.len())
        .map_err(|_| DeviceError::at(Stage::Upload, "target exceeds 4 GiB"))?;

    // Declaration order is release order, reversed.
    let device = backend.discover()?;
    let context = backend.create_context(&device)?;
    let queue = backend.create_queue(&device, &context)?;
    let program = backend.build_program(&context, KERNEL_SOURCE, BUILD_OPTIONS)?;
    let kernel = backend.create_kernel(&program, KERNEL_NAME)?;
    let text_buf = backend.upload(&context, text)?;
    let pattern_buf = backend.upload(&context, pattern)?;
    let result_buf = backend.zeroed_counter(&context)?;

    let args = KernelArgs {
        text: &text_buf,
        pattern: &pattern_buf,
        result: &result_buf,
        text_len,
        pattern_len,
        whole_word: u32::from(mode == MatchMode::WholeWord),
    };
    backend.launch(&queue, &kernel, &args, config)?;
    let count = backend.read_counter(&queue, &result_buf)?;
    Ok(u64::from(count))
}

/// Run the pipeline on the backend selected by `kind`.
///
/// There is no fallback: if `kind` is unavailable the error is returned.
pub fn dispatch_on(
    kind: DeviceKind,
    text: &[u8],
    pattern: &[u8],
    mode: MatchMode,
    config: LaunchConfig,
) -> Result<u64, DeviceError> {
    match kind {
        DeviceKind::Host => dispatch(&HostBackend::new(), text, pattern, mode, config),
        #[cfg(feature = "opencl")]
        DeviceKind::OpenCl => dispatch(&opencl::OpenClBackend, text, pattern, mode, config),
        #[cfg(not(feature = "opencl"))]
        DeviceKind::OpenCl => Err(DeviceError::Unsupported),
    }
}

/// Compute-device strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuCounter {
    device: DeviceKind,
    mode: MatchMode,
    launch: LaunchConfig,
}

impl GpuCounter {
    /// Counter on `device` with substring matching and default work sizes.
    #[must_use]
    pub fn new(device: DeviceKind) -> Self {
        Self {
            device,
            ..Self::default()
        }
    }

    /// Override the match mode.
    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the launch geometry.
    #[must_use]
    pub fn with_launch(mut self, launch: LaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    /// Configured match mode.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }
}

impl Counter for GpuCounter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ParallelGpu
    }

    fn count(&self, path: &Path, target: &Target) -> Result<CountResult, CountError> {
        timed(|| {
            let tokens = TokenSequence::load(path)?;
            let text = tokens.flatten();
            let count = dispatch_on(self.device, &text, target.as_bytes(), self.mode, self.launch)?;
            Ok(count)
        })
    }
}
