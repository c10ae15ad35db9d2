/// Simple abstraction over `wgpu` types to run the integration kernels on the GPU.
pub mod resources;

use crate::{
    dispatch::{BufferId, BufferUsage, ComputeDevice, KernelArg, KernelId},
    error::{Error, Result},
    gpu::resources::{DeviceBuffer, KernelPipeline},
    kernels::Kernel,
};
use std::path::PathBuf;

/// [`ComputeDevice`] backed by a `wgpu` device.
///
/// Kernels are recorded into a single command encoder and submitted when a buffer is read back,
/// so consecutive enqueues run in order without round trips to the host. The adapter must support
/// [`wgpu::Features::SHADER_F64`].
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: wgpu::AdapterInfo,
    workgroup_size: u32,
    kernel_source: Option<PathBuf>,
    buffers: Vec<DeviceBuffer>,
    kernels: Vec<KernelPipeline>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl WgpuDevice {
    /// Requests a high performance adapter and creates a device compiling kernels with the given
    /// workgroup size.
    #[inline]
    pub fn new(workgroup_size: u32) -> Result<Self> {
        pollster::block_on(Self::new_async(workgroup_size))
    }

    /// Same as [`WgpuDevice::new`], without blocking.
    pub async fn new_async(workgroup_size: u32) -> Result<Self> {
        if workgroup_size == 0 {
            return Err(Error::Config("local size must be positive".to_owned()));
        }

        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .ok_or(Error::NoAdapter)?;

        let info = adapter.get_info();
        if !adapter.features().contains(wgpu::Features::SHADER_F64) {
            return Err(Error::MissingF64Support(info.name));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("nbody_multistep"),
                    required_features: wgpu::Features::SHADER_F64,
                    required_limits: adapter.limits(),
                },
                None,
            )
            .await?;

        log::info!("using {} ({:?})", info.name, info.backend);

        Ok(Self {
            device,
            queue,
            info,
            workgroup_size,
            kernel_source: None,
            buffers: Vec::new(),
            kernels: Vec::new(),
            encoder: None,
        })
    }

    /// Reads kernel sources from `dir` when it holds a `<entry_point>.wgsl` file.
    #[inline]
    pub fn with_kernel_source(mut self, dir: Option<PathBuf>) -> Self {
        self.kernel_source = dir;
        self
    }

    /// The underlying [`wgpu::Device`].
    #[inline]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn take_encoder(&mut self) -> wgpu::CommandEncoder {
        self.encoder.take().unwrap_or_else(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None })
        })
    }
}

impl ComputeDevice for WgpuDevice {
    fn name(&self) -> String {
        format!("{} ({:?})", self.info.name, self.info.backend)
    }

    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<BufferId> {
        self.buffers
            .push(DeviceBuffer::new(&self.device, label, contents, usage));
        Ok(BufferId(self.buffers.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, contents: &[u8]) -> Result<()> {
        let target = self
            .buffers
            .get(buffer.0)
            .ok_or(Error::UnknownBuffer(buffer.0))?;

        let end = offset + contents.len() as u64;
        if end > target.size() {
            return Err(Error::Write(format!(
                "range {offset}..{end} out of bounds of `{}` ({} bytes)",
                target.label(),
                target.size()
            )));
        }

        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0
            || contents.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0
        {
            return Err(Error::Write(format!(
                "range {offset}..{end} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        // Queue writes run ahead of unsubmitted commands.
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit([encoder.finish()]);
        }

        self.queue
            .write_buffer(self.buffers[buffer.0].buffer(), offset, contents);
        Ok(())
    }

    fn create_kernel(&mut self, entry_point: &str) -> Result<KernelId> {
        let kernel = Kernel::from_entry_point(entry_point)?;
        let source = resources::kernel_source(
            kernel,
            self.workgroup_size,
            self.kernel_source.as_deref(),
        )?;

        log::debug!("building `{kernel}` with workgroup size {}", self.workgroup_size);
        self.kernels
            .push(KernelPipeline::new(&self.device, kernel, &source)?);
        Ok(KernelId(self.kernels.len() - 1))
    }

    fn set_arg(&mut self, kernel: KernelId, index: u32, arg: KernelArg) -> Result<()> {
        let pipeline = self
            .kernels
            .get_mut(kernel.0)
            .ok_or_else(|| Error::UnknownKernel(format!("#{}", kernel.0)))?;

        if let KernelArg::Buffer(id) = arg {
            let buffer = self.buffers.get(id.0).ok_or(Error::UnknownBuffer(id.0))?;
            buffer.usage().check_binding(pipeline.kernel(), index)?;
        }

        pipeline.set_arg(index, arg)
    }

    fn enqueue(&mut self, kernel: KernelId, global_size: u32, local_size: u32) -> Result<()> {
        if local_size != self.workgroup_size {
            return Err(Error::Config(format!(
                "local size {local_size} differs from the compiled workgroup size {}",
                self.workgroup_size
            )));
        }

        if kernel.0 >= self.kernels.len() {
            return Err(Error::UnknownKernel(format!("#{}", kernel.0)));
        }

        let mut encoder = self.take_encoder();
        let result = self.kernels[kernel.0].encode(
            &self.device,
            &mut encoder,
            &self.buffers,
            global_size.div_ceil(local_size),
        );

        self.encoder = Some(encoder);
        result
    }

    fn read_buffer(&mut self, buffer: BufferId, offset: u64, size: u64) -> Result<Vec<u8>> {
        let source = self
            .buffers
            .get(buffer.0)
            .ok_or(Error::UnknownBuffer(buffer.0))?;

        if offset + size > source.size() {
            return Err(Error::ReadBack(format!(
                "range {offset}..{} out of bounds of `{}` ({} bytes)",
                offset + size,
                source.label(),
                source.size()
            )));
        }

        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(Error::ReadBack(format!(
                "range {offset}..{} is not {}-byte aligned",
                offset + size,
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        let encoder = self.take_encoder();
        let source = self.buffers[buffer.0].buffer();

        pollster::block_on(resources::read_back(
            &self.device,
            &self.queue,
            encoder,
            source,
            offset,
            size,
        ))
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit([encoder.finish()]);
        }

        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryCursor;

    // Tests run on machines without a suitable adapter too.
    fn device() -> Option<WgpuDevice> {
        match WgpuDevice::new(64) {
            Ok(device) => Some(device),
            Err(e) => {
                eprintln!("skipping: {e}");
                None
            }
        }
    }

    #[test]
    fn shift_history_kernel() {
        let Some(mut device) = device() else {
            return;
        };

        let cursor = device
            .create_buffer(
                "cursor",
                bytemuck::bytes_of(&HistoryCursor::IDENTITY),
                BufferUsage::ReadWrite,
            )
            .unwrap();
        let shift = device.create_kernel("shift_history").unwrap();
        device.set_arg(shift, 0, KernelArg::Buffer(cursor)).unwrap();
        device.set_arg(shift, 1, KernelArg::U32(15)).unwrap();
        device.set_arg(shift, 2, KernelArg::U32(13)).unwrap();

        for _ in 0..15 {
            device.enqueue(shift, 64, 64).unwrap();
        }

        let bytes = device.read_buffer(cursor, 0, 8).unwrap();
        let read: HistoryCursor = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(read.position_head, 0);
        assert_eq!(read.acceleration_head, 11);
    }

    #[test]
    fn write_follows_enqueued_kernels() {
        let Some(mut device) = device() else {
            return;
        };

        let cursor = device
            .create_buffer(
                "cursor",
                bytemuck::bytes_of(&HistoryCursor::IDENTITY),
                BufferUsage::ReadWrite,
            )
            .unwrap();
        let shift = device.create_kernel("shift_history").unwrap();
        device.set_arg(shift, 0, KernelArg::Buffer(cursor)).unwrap();
        device.set_arg(shift, 1, KernelArg::U32(5)).unwrap();
        device.set_arg(shift, 2, KernelArg::U32(3)).unwrap();

        device.enqueue(shift, 64, 64).unwrap();
        device
            .write_buffer(cursor, 0, bytemuck::bytes_of(&HistoryCursor::IDENTITY))
            .unwrap();
        device.enqueue(shift, 64, 64).unwrap();

        let bytes = device.read_buffer(cursor, 0, 8).unwrap();
        let read: HistoryCursor = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(read.position_head, 4);
        assert_eq!(read.acceleration_head, 2);
    }

    #[test]
    fn every_kernel_builds() {
        let Some(mut device) = device() else {
            return;
        };

        for kernel in Kernel::ALL {
            device.create_kernel(kernel.entry_point()).unwrap();
        }
    }
}
