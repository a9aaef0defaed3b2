//! OpenCL backend.
//!
//! Only compiled with the `opencl` feature.  The `opencl3` wrapper types
//! release their handles (`clRelease*`) when dropped, which is what gives
//! [`super::dispatch`] its teardown guarantee.

#![allow(unsafe_code)]

use std::ffi::c_void;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{CL_DEVICE_TYPE_ALL, Device, get_all_devices};
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE};
use opencl3::program::Program;
use opencl3::types::{CL_BLOCKING, cl_uint};

use super::{Backend, DeviceError, KernelArgs, LaunchConfig, Stage};

/// First device of the first OpenCL platform.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenClBackend;

impl Backend for OpenClBackend {
    type Device = Device;
    type Context = Context;
    type Queue = CommandQueue;
    type Program = Program;
    type Kernel = Kernel;
    type Bytes = Buffer<u8>;
    type Counter = Buffer<cl_uint>;

    fn discover(&self) -> Result<Device, DeviceError> {
        let ids = get_all_devices(CL_DEVICE_TYPE_ALL).map_err(|_| DeviceError::NoDevice)?;
        ids.first()
            .copied()
            .map(Device::new)
            .ok_or(DeviceError::NoDevice)
    }

    fn create_context(&self, device: &Device) -> Result<Context, DeviceError> {
        Context::from_device(device).map_err(|e| DeviceError::at(Stage::Context, e))
    }

    fn create_queue(&self, _device: &Device, context: &Context) -> Result<CommandQueue, DeviceError> {
        // The 1.2 entry point; some platforms (macOS) stop at OpenCL 1.2.
        #[allow(deprecated)]
        CommandQueue::create_default(context, 0).map_err(|e| DeviceError::at(Stage::Queue, e))
    }

    fn build_program(
        &self,
        context: &Context,
        source: &str,
        options: &str,
    ) -> Result<Program, DeviceError> {
        Program::create_and_build_from_source(context, source, options)
            .map_err(|log| DeviceError::Compile { log })
    }

    fn create_kernel(&self, program: &Program, name: &str) -> Result<Kernel, DeviceError> {
        Kernel::create(program, name).map_err(|e| DeviceError::at(Stage::Kernel, e))
    }

    fn upload(&self, context: &Context, bytes: &[u8]) -> Result<Buffer<u8>, DeviceError> {
        // Zero-sized buffers are invalid; the kernel only reads `text_len` bytes.
        let host: &[u8] = if bytes.is_empty() { &[0] } else { bytes };
        // SAFETY: `host` is valid for `host.len()` bytes for the duration of
        // the call, and CL_MEM_COPY_HOST_PTR copies it before returning; the
        // pointer is never written through.
        unsafe {
            Buffer::<u8>::create(
                context,
                CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
                host.len(),
                host.as_ptr().cast_mut().cast::<c_void>(),
            )
        }
        .map_err(|e| DeviceError::at(Stage::Upload, e))
    }

    fn zeroed_counter(&self, context: &Context) -> Result<Buffer<cl_uint>, DeviceError> {
        let mut zero: [cl_uint; 1] = [0];
        // SAFETY: `zero` outlives the call and CL_MEM_COPY_HOST_PTR copies it.
        unsafe {
            Buffer::<cl_uint>::create(
                context,
                CL_MEM_READ_WRITE | CL_MEM_COPY_HOST_PTR,
                1,
                zero.as_mut_ptr().cast::<c_void>(),
            )
        }
        .map_err(|e| DeviceError::at(Stage::ResultBuffer, e))
    }

    fn launch(
        &self,
        queue: &CommandQueue,
        kernel: &Kernel,
        args: &KernelArgs<'_, Self>,
        config: LaunchConfig,
    ) -> Result<(), DeviceError> {
        // SAFETY: argument order and types match the kernel signature:
        // (uchar*, uchar*, uint*, uint, uint, uint).  The buffers outlive the
        // enqueue because `read_counter` blocks on the same in-order queue.
        let event = unsafe {
            ExecuteKernel::new(kernel)
                .set_arg(args.text)
                .set_arg(args.pattern)
                .set_arg(args.result)
                .set_arg(&args.text_len)
                .set_arg(&args.pattern_len)
                .set_arg(&args.whole_word)
                .set_global_work_size(config.global())
                .set_local_work_size(config.local())
                .enqueue_nd_range(queue)
        }
        .map_err(|e| DeviceError::at(Stage::Launch, e))?;
        event.wait().map_err(|e| DeviceError::at(Stage::Launch, e))
    }

    fn read_counter(
        &self,
        queue: &CommandQueue,
        counter: &Buffer<cl_uint>,
    ) -> Result<u32, DeviceError> {
        let mut out: [cl_uint; 1] = [0];
        // SAFETY: the read is blocking, so `out` is fully written before the
        // call returns and is not aliased meanwhile.
        unsafe { queue.enqueue_read_buffer(counter, CL_BLOCKING, 0, &mut out, &[]) }
            .map_err(|e| DeviceError::at(Stage::Readback, e))?;
        Ok(out[0])
    }
}
