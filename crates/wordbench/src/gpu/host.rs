//! Host-side emulation of the match kernel.
//!
//! Runs the same strided, atomically-accumulated algorithm as
//! `kernels/count_matches.cl`.  Work-groups are split into contiguous blocks,
//! one OS thread per block, capped at the available hardware parallelism.  It is never
//! chosen implicitly; select it with `--device host` or construct it
//! directly.  Every resource it hands out is tracked, so
//! [`HostBackend::live_resources`] reports what has not been released yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use super::{Backend, DeviceError, KERNEL_NAME, KernelArgs, LaunchConfig, Stage};
use crate::corpus::SEPARATOR;

/// Emulated compute device.
#[derive(Debug, Default)]
pub struct HostBackend {
    live: Arc<AtomicUsize>,
    fail_at: Option<Stage>,
}

impl HostBackend {
    /// A backend that never fails on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `stage` always fails, for exercising teardown.
    ///
    /// Failing at [`Stage::Discover`] reports [`DeviceError::NoDevice`].
    #[must_use]
    pub fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    /// Number of resources handed out and not yet dropped.
    #[must_use]
    pub fn live_resources(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn check(&self, stage: Stage) -> Result<(), DeviceError> {
        match self.fail_at {
            Some(Stage::Discover) if stage == Stage::Discover => Err(DeviceError::NoDevice),
            Some(Stage::Compile) if stage == Stage::Compile => Err(DeviceError::Compile {
                log: "injected failure".to_string(),
            }),
            Some(failing) if failing == stage => Err(DeviceError::at(stage, "injected failure")),
            _ => Ok(()),
        }
    }

    fn track(&self) -> Tracked {
        self.live.fetch_add(1, Ordering::SeqCst);
        Tracked {
            live: Arc::clone(&self.live),
        }
    }
}

/// Registration of one live resource; unregisters on drop.
#[derive(Debug)]
pub struct Tracked {
    live: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Emulated device, context, queue or kernel handle.
#[derive(Debug)]
pub struct HostHandle {
    _tracked: Tracked,
}

/// Emulated compiled program.
#[derive(Debug)]
pub struct HostProgram {
    source: String,
    _tracked: Tracked,
}

/// Emulated read-only buffer.
#[derive(Debug)]
pub struct HostBuffer {
    data: Box<[u8]>,
    _tracked: Tracked,
}

/// Emulated accumulator.
#[derive(Debug)]
pub struct HostCounter {
    value: AtomicU32,
    _tracked: Tracked,
}

impl Backend for HostBackend {
    type Device = HostHandle;
    type Context = HostHandle;
    type Queue = HostHandle;
    type Program = HostProgram;
    type Kernel = HostHandle;
    type Bytes = HostBuffer;
    type Counter = HostCounter;

    fn discover(&self) -> Result<HostHandle, DeviceError> {
        self.check(Stage::Discover)?;
        Ok(HostHandle {
            _tracked: self.track(),
        })
    }

    fn create_context(&self, _device: &HostHandle) -> Result<HostHandle, DeviceError> {
        self.check(Stage::Context)?;
        Ok(HostHandle {
            _tracked: self.track(),
        })
    }

    fn create_queue(
        &self,
        _device: &HostHandle,
        _context: &HostHandle,
    ) -> Result<HostHandle, DeviceError> {
        self.check(Stage::Queue)?;
        Ok(HostHandle {
            _tracked: self.track(),
        })
    }

    fn build_program(
        &self,
        _context: &HostHandle,
        source: &str,
        _options: &str,
    ) -> Result<HostProgram, DeviceError> {
        self.check(Stage::Compile)?;
        Ok(HostProgram {
            source: source.to_string(),
            _tracked: self.track(),
        })
    }

    fn create_kernel(&self, program: &HostProgram, name: &str) -> Result<HostHandle, DeviceError> {
        self.check(Stage::Kernel)?;
        // Only the built-in kernel can be emulated.
        if name != KERNEL_NAME || !program.source.contains(&format!("__kernel void {name}(")) {
            return Err(DeviceError::at(
                Stage::Kernel,
                format!("no kernel named {name:?}"),
            ));
        }
        Ok(HostHandle {
            _tracked: self.track(),
        })
    }

    fn upload(&self, _context: &HostHandle, bytes: &[u8]) -> Result<HostBuffer, DeviceError> {
        self.check(Stage::Upload)?;
        Ok(HostBuffer {
            data: bytes.into(),
            _tracked: self.track(),
        })
    }

    fn zeroed_counter(&self, _context: &HostHandle) -> Result<HostCounter, DeviceError> {
        self.check(Stage::ResultBuffer)?;
        Ok(HostCounter {
            value: AtomicU32::new(0),
            _tracked: self.track(),
        })
    }

    fn launch(
        &self,
        _queue: &HostHandle,
        _kernel: &HostHandle,
        args: &KernelArgs<'_, Self>,
        config: LaunchConfig,
    ) -> Result<(), DeviceError> {
        self.check(Stage::Launch)?;
        let text = args
            .text
            .data
            .get(..args.text_len as usize)
            .ok_or_else(|| DeviceError::at(Stage::Launch, "text length exceeds buffer"))?;
        let pattern = args
            .pattern
            .data
            .get(..args.pattern_len as usize)
            .ok_or_else(|| DeviceError::at(Stage::Launch, "pattern length exceeds buffer"))?;
        let whole_word = args.whole_word != 0;
        let stride = config.global();
        let result = &args.result.value;

        let groups = config.global() / config.local();
        let threads = std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get)
            .min(groups);
        let groups_per_thread = groups.div_ceil(threads);

        // Each thread runs a contiguous block of work-groups.
        std::thread::scope(|s| {
            for block in 0..threads {
                let first_group = block * groups_per_thread;
                let last_group = (first_group + groups_per_thread).min(groups);
                s.spawn(move || {
                    for group in first_group..last_group {
                        let first = group * config.local();
                        for gid in first..first + config.local() {
                            let local = lane_count(text, pattern, gid, stride, whole_word);
                            if local > 0 {
                                result.fetch_add(local, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        });
        Ok(())
    }

    fn read_counter(&self, _queue: &HostHandle, counter: &HostCounter) -> Result<u32, DeviceError> {
        self.check(Stage::Readback)?;
        Ok(counter.value.load(Ordering::Relaxed))
    }
}

/// Matches found by work-item `gid` of `stride`, mirroring the kernel body.
fn lane_count(text: &[u8], pattern: &[u8], gid: usize, stride: usize, whole_word: bool) -> u32 {
    if pattern.is_empty() || pattern.len() > text.len() {
        return 0;
    }
    let last_start = text.len() - pattern.len();
    let mut count = 0;
    let mut i = gid;
    while i <= last_start {
        if is_match(text, pattern, i, last_start, whole_word) {
            count += 1;
        }
        // Stop before stepping past `last_start`, as the kernel does.
        if last_start - i < stride {
            break;
        }
        i += stride;
    }
    count
}

fn is_match(text: &[u8], pattern: &[u8], i: usize, last_start: usize, whole_word: bool) -> bool {
    if !text[i..i + pattern.len()].eq_ignore_ascii_case(pattern) {
        return false;
    }
    if !whole_word {
        return true;
    }
    let before_ok = i == 0 || text[i - 1] == SEPARATOR;
    let after_ok = i == last_start || text[i + pattern.len()] == SEPARATOR;
    before_ok && after_ok
}
