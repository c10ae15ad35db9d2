//! Minimal compute-device interface the run loop drives.
//!
//! A device owns byte buffers and compiled kernels. Kernels are enqueued on a single in-order
//! queue: a kernel observes every write of the kernels enqueued before it, and
//! [`ComputeDevice::read_buffer`] blocks until every enqueued kernel has completed.

use crate::{
    error::{Error, Result},
    kernels::{ArgKind, Kernel},
};

/// Handle to a buffer owned by a [`ComputeDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) usize);

/// Handle to a kernel compiled by a [`ComputeDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelId(pub(crate) usize);

/// Intended use of a buffer. The host may write either kind with
/// [`ComputeDevice::write_buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Only read by kernels. Binding it to an output argument fails.
    ReadOnly,
    /// Read and written by kernels.
    ReadWrite,
}

impl BufferUsage {
    /// Checks that a buffer of this usage can be bound to argument `index` of `kernel`.
    pub fn check_binding(self, kernel: Kernel, index: u32) -> Result<()> {
        let output = kernel.signature().get(index as usize) == Some(&ArgKind::Output);
        if self == Self::ReadOnly && output {
            return Err(Error::Argument {
                kernel: kernel.entry_point(),
                index,
                reason: "read-only buffer bound to an output".to_owned(),
            });
        }

        Ok(())
    }
}

/// Value bound to a kernel argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KernelArg {
    /// A buffer created by the same device.
    Buffer(BufferId),
    /// Double precision scalar.
    F64(f64),
    /// Unsigned 32-bit scalar.
    U32(u32),
}

impl KernelArg {
    /// Human readable kind, used in binding errors.
    #[inline]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Buffer(_) => "buffer",
            Self::F64(_) => "f64",
            Self::U32(_) => "u32",
        }
    }
}

/// Device able to run the kernels of [`kernels::Kernel`](crate::kernels::Kernel).
pub trait ComputeDevice {
    /// Short description of the device, for logs.
    fn name(&self) -> String;

    /// Creates a buffer initialised with `contents`.
    fn create_buffer(&mut self, label: &str, contents: &[u8], usage: BufferUsage)
        -> Result<BufferId>;

    /// Overwrites `buffer` from `offset` with `contents`, after every kernel enqueued so far.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, contents: &[u8]) -> Result<()>;

    /// Compiles the kernel named `entry_point`.
    fn create_kernel(&mut self, entry_point: &str) -> Result<KernelId>;

    /// Binds `arg` to argument `index` of `kernel`. Bindings persist across enqueues.
    fn set_arg(&mut self, kernel: KernelId, index: u32, arg: KernelArg) -> Result<()>;

    /// Enqueues `kernel` over `global_size` work items in groups of `local_size`.
    fn enqueue(&mut self, kernel: KernelId, global_size: u32, local_size: u32) -> Result<()>;

    /// Blocks until the queue is drained and returns `size` bytes of `buffer` from `offset`.
    fn read_buffer(&mut self, buffer: BufferId, offset: u64, size: u64) -> Result<Vec<u8>>;

    /// Blocks until the queue is drained.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: ComputeDevice + ?Sized> ComputeDevice for &mut D {
    #[inline]
    fn name(&self) -> String {
        (**self).name()
    }

    #[inline]
    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<BufferId> {
        (**self).create_buffer(label, contents, usage)
    }

    #[inline]
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, contents: &[u8]) -> Result<()> {
        (**self).write_buffer(buffer, offset, contents)
    }

    #[inline]
    fn create_kernel(&mut self, entry_point: &str) -> Result<KernelId> {
        (**self).create_kernel(entry_point)
    }

    #[inline]
    fn set_arg(&mut self, kernel: KernelId, index: u32, arg: KernelArg) -> Result<()> {
        (**self).set_arg(kernel, index, arg)
    }

    #[inline]
    fn enqueue(&mut self, kernel: KernelId, global_size: u32, local_size: u32) -> Result<()> {
        (**self).enqueue(kernel, global_size, local_size)
    }

    #[inline]
    fn read_buffer(&mut self, buffer: BufferId, offset: u64, size: u64) -> Result<Vec<u8>> {
        (**self).read_buffer(buffer, offset, size)
    }

    #[inline]
    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Rounds `count` up to a multiple of `local_size`.
#[inline]
pub const fn global_size(count: u32, local_size: u32) -> u32 {
    count.div_ceil(local_size) * local_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_size_rounds_up() {
        assert_eq!(global_size(0, 64), 0);
        assert_eq!(global_size(1, 64), 64);
        assert_eq!(global_size(64, 64), 64);
        assert_eq!(global_size(65, 64), 128);
        assert_eq!(global_size(3, 1), 3);
    }

    #[test]
    fn read_only_buffers_bind_to_inputs_only() {
        let kernel = Kernel::IntegrateEuler;
        assert!(BufferUsage::ReadOnly.check_binding(kernel, 4).is_ok());
        assert!(matches!(
            BufferUsage::ReadOnly.check_binding(kernel, 2),
            Err(Error::Argument { index: 2, .. })
        ));
        assert!(BufferUsage::ReadWrite.check_binding(kernel, 2).is_ok());
    }
}
