use crate::{
    dispatch::{BufferId, BufferUsage, ComputeDevice, KernelArg, KernelId},
    error::{Error, Result},
    history::{HistoryCursor, MultistepScheme},
    kernels::{host, ArgKind, Kernel},
    vector::Double4,
};
use bytemuck::Pod;

struct HostBuffer {
    label: String,
    data: Vec<f64>,
    size: usize,
    usage: BufferUsage,
}

struct HostKernel {
    kernel: Kernel,
    args: Vec<Option<KernelArg>>,
}

/// [`ComputeDevice`] running every kernel on the calling thread, in submission order.
///
/// Buffers are stored 8-byte aligned so that they can be viewed as `f64`, [`Double4`] or
/// [`HistoryCursor`] records without copying. Kernels complete before [`enqueue`] returns.
///
/// [`enqueue`]: ComputeDevice::enqueue
#[derive(Default)]
pub struct HostDevice {
    buffers: Vec<HostBuffer>,
    kernels: Vec<HostKernel>,
}

impl HostDevice {
    /// Creates a new [`HostDevice`] with no buffers.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self, id: BufferId) -> Result<&HostBuffer> {
        self.buffers.get(id.0).ok_or(Error::UnknownBuffer(id.0))
    }

    fn kernel(&self, id: KernelId) -> Result<&HostKernel> {
        self.kernels
            .get(id.0)
            .ok_or_else(|| Error::UnknownKernel(format!("#{}", id.0)))
    }

    /// Checks that every argument is bound with the right kind and that no output aliases another
    /// buffer argument.
    fn bound_args(&self, id: KernelId) -> Result<(Kernel, Vec<KernelArg>)> {
        let HostKernel { kernel, args } = self.kernel(id)?;
        let signature = kernel.signature();
        let mut bound = Vec::with_capacity(signature.len());

        for (index, &kind) in signature.iter().enumerate() {
            let argument_error = |reason: String| Error::Argument {
                kernel: kernel.entry_point(),
                index: index as u32,
                reason,
            };

            let arg = args
                .get(index)
                .copied()
                .flatten()
                .ok_or_else(|| argument_error("not set".to_owned()))?;

            let matches = match (kind, arg) {
                (ArgKind::Input | ArgKind::Output, KernelArg::Buffer(buffer)) => {
                    self.buffer(buffer)?;
                    true
                }
                (ArgKind::F64, KernelArg::F64(_)) | (ArgKind::U32, KernelArg::U32(_)) => true,
                _ => false,
            };

            if !matches {
                return Err(argument_error(format!(
                    "expected {kind:?}, got {}",
                    arg.kind_name()
                )));
            }

            if kind == ArgKind::Output {
                let aliased = bound
                    .iter()
                    .chain(args[index + 1..].iter().flatten())
                    .any(|other| *other == arg);
                if aliased {
                    return Err(argument_error(
                        "output buffer is bound to another argument".to_owned(),
                    ));
                }
            }

            bound.push(arg);
        }

        Ok((*kernel, bound))
    }
}

/// Arguments of one kernel launch, with output buffers moved out of the device.
struct Launch<'a> {
    kernel: Kernel,
    args: &'a [KernelArg],
    buffers: &'a [HostBuffer],
    outputs: Vec<Option<&'a mut [f64]>>,
}

impl<'a> Launch<'a> {
    fn error(&self, index: u32, reason: impl Into<String>) -> Error {
        Error::Argument {
            kernel: self.kernel.entry_point(),
            index,
            reason: reason.into(),
        }
    }

    fn check_len<T>(&self, index: u32, records: &[T], min_len: usize) -> Result<()> {
        if records.len() < min_len {
            return Err(self.error(
                index,
                format!("buffer holds {} records, {min_len} needed", records.len()),
            ));
        }

        Ok(())
    }

    fn input<T: Pod>(&self, index: u32, min_len: usize) -> Result<&'a [T]> {
        let KernelArg::Buffer(id) = self.args[index as usize] else {
            return Err(self.error(index, "not a buffer"));
        };

        let buffers: &'a [HostBuffer] = self.buffers;
        let buffer = &buffers[id.0];
        let records: &[T] = bytemuck::try_cast_slice(buffer.data.as_slice())
            .map_err(|e| self.error(index, format!("`{}`: {e}", buffer.label)))?;
        self.check_len(index, records, min_len)?;
        Ok(records)
    }

    fn output<T: Pod>(&mut self, index: u32, min_len: usize) -> Result<&'a mut [T]> {
        let data = self.outputs[index as usize]
            .take()
            .ok_or_else(|| self.error(index, "not an output buffer"))?;

        let records: &mut [T] =
            bytemuck::try_cast_slice_mut(data).map_err(|e| self.error(index, e.to_string()))?;
        self.check_len(index, records, min_len)?;
        Ok(records)
    }

    fn f64(&self, index: u32) -> Result<f64> {
        match self.args[index as usize] {
            KernelArg::F64(value) => Ok(value),
            _ => Err(self.error(index, "not an f64")),
        }
    }

    fn u32(&self, index: u32) -> Result<u32> {
        match self.args[index as usize] {
            KernelArg::U32(value) => Ok(value),
            _ => Err(self.error(index, "not a u32")),
        }
    }

    fn run(mut self, global_size: u32) -> Result<()> {
        let covers = |n: usize| {
            if (global_size as usize) < n {
                return Err(Error::Config(format!(
                    "global size {global_size} of `{}` does not cover {n} work items",
                    self.kernel
                )));
            }
            Ok(n)
        };

        match self.kernel {
            Kernel::IntegrateEuler | Kernel::IntegrateLeapfrog => {
                let n = covers(self.u32(6)? as usize)?;
                let dt = self.f64(5)?;
                host::integrate_single_step(
                    self.input::<Double4>(0, n)?,
                    self.input(1, n)?,
                    self.output(2, n)?,
                    self.output(3, n)?,
                    self.input(4, n)?,
                    dt,
                    n,
                )
            }
            Kernel::Rk4Stage => {
                let n = covers(self.u32(6)? as usize)?;
                let dt = self.f64(5)?;
                let stage = self.u32(7)? as usize;
                if stage >= 4 {
                    return Err(self.error(7, format!("stage {stage} out of range")));
                }

                host::rk4_stage(
                    self.input::<Double4>(0, n)?,
                    self.input(1, n)?,
                    self.output(2, 4 * n)?,
                    self.output(3, 4 * n)?,
                    self.input(4, n)?,
                    dt,
                    n,
                    stage,
                )
            }
            Kernel::Rk4Combine => {
                let n = covers(self.u32(7)? as usize)?;
                let dt = self.f64(6)?;
                host::rk4_combine(
                    self.input::<Double4>(0, n)?,
                    self.input(1, n)?,
                    self.input(2, 4 * n)?,
                    self.input(3, 4 * n)?,
                    self.output(4, n)?,
                    self.output(5, n)?,
                    dt,
                    n,
                );
                Ok(())
            }
            Kernel::IntegrateM52 | Kernel::IntegrateM157 => {
                let scheme = if self.kernel == Kernel::IntegrateM52 {
                    MultistepScheme::FivePoint
                } else {
                    MultistepScheme::FifteenPoint
                };
                let n = covers(self.u32(5)? as usize)?;
                let dt = self.f64(4)?;
                let cursor = self.input::<HistoryCursor>(3, 1)?[0];

                host::integrate_multistep(
                    scheme,
                    self.output(0, scheme.position_slots() * n)?,
                    self.output(1, scheme.acceleration_slots() * n)?,
                    self.input(2, n)?,
                    cursor,
                    dt,
                    n,
                )
            }
            Kernel::ShiftHistory => {
                covers(1)?;
                let position_slots = self.u32(1)?;
                let acceleration_slots = self.u32(2)?;
                if position_slots == 0 || acceleration_slots == 0 {
                    return Err(self.error(1, "history rings need at least one slot"));
                }

                let cursor = self.output::<HistoryCursor>(0, 1)?;
                host::shift_history(&mut cursor[0], position_slots, acceleration_slots);
                Ok(())
            }
        }
    }
}

impl ComputeDevice for HostDevice {
    fn name(&self) -> String {
        "host".to_owned()
    }

    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<BufferId> {
        let mut data = vec![0.0f64; contents.len().div_ceil(8)];
        bytemuck::cast_slice_mut::<f64, u8>(&mut data)[..contents.len()].copy_from_slice(contents);

        self.buffers.push(HostBuffer {
            label: label.to_owned(),
            data,
            size: contents.len(),
            usage,
        });

        log::trace!("created buffer `{label}` of {} bytes", contents.len());
        Ok(BufferId(self.buffers.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, contents: &[u8]) -> Result<()> {
        let host_buffer = self
            .buffers
            .get_mut(buffer.0)
            .ok_or(Error::UnknownBuffer(buffer.0))?;

        let (start, end) = (offset as usize, offset as usize + contents.len());
        if end > host_buffer.size {
            return Err(Error::Write(format!(
                "range {start}..{end} out of bounds of `{}` ({} bytes)",
                host_buffer.label, host_buffer.size
            )));
        }

        bytemuck::cast_slice_mut::<f64, u8>(&mut host_buffer.data)[start..end]
            .copy_from_slice(contents);
        Ok(())
    }

    fn create_kernel(&mut self, entry_point: &str) -> Result<KernelId> {
        let kernel = Kernel::from_entry_point(entry_point)?;
        self.kernels.push(HostKernel {
            kernel,
            args: vec![None; kernel.signature().len()],
        });

        Ok(KernelId(self.kernels.len() - 1))
    }

    fn set_arg(&mut self, kernel: KernelId, index: u32, arg: KernelArg) -> Result<()> {
        let host_kernel = self
            .kernels
            .get_mut(kernel.0)
            .ok_or_else(|| Error::UnknownKernel(format!("#{}", kernel.0)))?;

        if let KernelArg::Buffer(id) = arg {
            let buffer = self.buffers.get(id.0).ok_or(Error::UnknownBuffer(id.0))?;
            buffer.usage.check_binding(host_kernel.kernel, index)?;
        }

        let slot = host_kernel
            .args
            .get_mut(index as usize)
            .ok_or_else(|| Error::Argument {
                kernel: host_kernel.kernel.entry_point(),
                index,
                reason: "index out of range".to_owned(),
            })?;

        *slot = Some(arg);
        Ok(())
    }

    fn enqueue(&mut self, kernel: KernelId, global_size: u32, local_size: u32) -> Result<()> {
        if local_size == 0 {
            return Err(Error::Config("local size must be positive".to_owned()));
        }

        let (kernel, args) = self.bound_args(kernel)?;

        let mut taken = Vec::new();
        for (index, (&kind, arg)) in kernel.signature().iter().zip(&args).enumerate() {
            if let (ArgKind::Output, KernelArg::Buffer(id)) = (kind, arg) {
                taken.push((index, id.0, std::mem::take(&mut self.buffers[id.0].data)));
            }
        }

        let mut outputs: Vec<Option<&mut [f64]>> = (0..args.len()).map(|_| None).collect();
        for (index, _, data) in &mut taken {
            outputs[*index] = Some(data.as_mut_slice());
        }

        let result = Launch {
            kernel,
            args: &args,
            buffers: &self.buffers,
            outputs,
        }
        .run(global_size);

        for (_, id, data) in taken {
            self.buffers[id].data = data;
        }

        result
    }

    fn read_buffer(&mut self, buffer: BufferId, offset: u64, size: u64) -> Result<Vec<u8>> {
        let host_buffer = self.buffer(buffer)?;
        let (start, end) = (offset as usize, (offset + size) as usize);
        if end > host_buffer.size {
            return Err(Error::ReadBack(format!(
                "range {start}..{end} out of bounds of `{}` ({} bytes)",
                host_buffer.label, host_buffer.size
            )));
        }

        Ok(bytemuck::cast_slice::<f64, u8>(&host_buffer.data)[start..end].to_vec())
    }
}
