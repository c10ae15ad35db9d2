use crate::{
    dispatch::{BufferUsage, KernelArg},
    error::{Error, Result},
    kernels::{ArgKind, Kernel},
};
use std::path::Path;
use wgpu::util::DeviceExt;

/// Binding of the storage buffer holding the scalar arguments of a kernel.
pub const PARAMS_BINDING: u32 = 8;

const COMMON: &str = include_str!("kernels/common.wgsl");

const SINGLE_STEP: &str = constcat::concat!(COMMON, include_str!("kernels/single_step.wgsl"));
const RK4_STAGE: &str = constcat::concat!(COMMON, include_str!("kernels/rk4_stage.wgsl"));
const RK4_COMBINE: &str = constcat::concat!(COMMON, include_str!("kernels/rk4_combine.wgsl"));
const MULTISTEP: &str = constcat::concat!(COMMON, include_str!("kernels/multistep.wgsl"));
const SHIFT_HISTORY: &str = constcat::concat!(COMMON, include_str!("kernels/shift_history.wgsl"));

/// Returns the built-in WGSL module defining `kernel`, before workgroup size substitution.
#[inline]
pub const fn builtin_source(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::IntegrateEuler | Kernel::IntegrateLeapfrog => SINGLE_STEP,
        Kernel::Rk4Stage => RK4_STAGE,
        Kernel::Rk4Combine => RK4_COMBINE,
        Kernel::IntegrateM52 | Kernel::IntegrateM157 => MULTISTEP,
        Kernel::ShiftHistory => SHIFT_HISTORY,
    }
}

/// Returns the processed WGSL source of `kernel` for the given workgroup size.
///
/// When `override_dir` is given, `<override_dir>/<entry_point>.wgsl` replaces the built-in kernel
/// body if it exists. The common helpers are prepended in both cases.
pub fn kernel_source(
    kernel: Kernel,
    workgroup_size: u32,
    override_dir: Option<&Path>,
) -> Result<String> {
    let source = match override_dir {
        Some(dir) => {
            if !dir.exists() {
                return Err(Error::MissingKernelSource(dir.to_path_buf()));
            }

            let path = dir.join(format!("{}.wgsl", kernel.entry_point()));
            if path.is_file() {
                log::info!("using kernel source {}", path.display());
                COMMON.to_owned() + &std::fs::read_to_string(path)?
            } else {
                log::debug!("no override for `{kernel}`, using the built-in source");
                builtin_source(kernel).to_owned()
            }
        }
        None => builtin_source(kernel).to_owned(),
    };

    Ok(source.replace("#WORKGROUP_SIZE", &(workgroup_size.to_string() + "u")))
}

/// Packs the scalar arguments of a launch, 8 bytes each in argument order.
pub fn pack_params(args: &[KernelArg]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for arg in args {
        match *arg {
            KernelArg::F64(value) => bytes.extend_from_slice(&value.to_le_bytes()),
            KernelArg::U32(value) => {
                bytes.extend_from_slice(&value.to_le_bytes());
                bytes.extend_from_slice(&[0; 4]);
            }
            KernelArg::Buffer(_) => {}
        }
    }
    bytes
}

/// Storage buffer with its label and intended use.
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    label: String,
    size: u64,
    usage: BufferUsage,
}

impl DeviceBuffer {
    /// Creates a storage buffer initialised with `contents`.
    #[inline]
    pub fn new(device: &wgpu::Device, label: &str, contents: &[u8], usage: BufferUsage) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            label: label.to_owned(),
            size: contents.len() as u64,
            usage,
        }
    }

    /// The underlying buffer.
    #[inline]
    pub const fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Size of the contents the buffer was created with.
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Label given at creation.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Usage given at creation.
    #[inline]
    pub const fn usage(&self) -> BufferUsage {
        self.usage
    }
}

/// Compiled kernel with the layout of its arguments.
pub struct KernelPipeline {
    kernel: Kernel,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
    args: Vec<Option<KernelArg>>,
}

impl KernelPipeline {
    /// Compiles `kernel` from `source`.
    ///
    /// Validation errors raised while building the module or the pipeline are returned as
    /// [`Error::KernelBuild`].
    pub fn new(device: &wgpu::Device, kernel: Kernel, source: &str) -> Result<Self> {
        let signature = kernel.signature();
        let mut entries: Vec<_> = signature
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.is_buffer())
            .map(|(index, &kind)| storage_entry(index as u32, kind == ArgKind::Input))
            .collect();

        if signature.iter().any(|kind| !kind.is_buffer()) {
            entries.push(storage_entry(PARAMS_BINDING, true));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &entries,
            label: Some(kernel.entry_point()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kernel.entry_point()),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.entry_point()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(kernel.entry_point()),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: kernel.entry_point(),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::KernelBuild {
                entry_point: kernel.entry_point().to_owned(),
                log: error.to_string(),
            });
        }

        Ok(Self {
            kernel,
            bind_group_layout,
            pipeline,
            args: vec![None; signature.len()],
        })
    }

    /// The compiled kernel.
    #[inline]
    pub const fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Binds `arg` to argument `index`.
    pub fn set_arg(&mut self, index: u32, arg: KernelArg) -> Result<()> {
        let kernel = self.kernel.entry_point();
        let slot = self
            .args
            .get_mut(index as usize)
            .ok_or_else(|| Error::Argument {
                kernel,
                index,
                reason: "index out of range".to_owned(),
            })?;

        *slot = Some(arg);
        Ok(())
    }

    /// Returns the bound arguments, checking them against the kernel signature.
    pub fn bound_args(&self) -> Result<Vec<KernelArg>> {
        let kernel = self.kernel.entry_point();
        self.kernel
            .signature()
            .iter()
            .zip(&self.args)
            .enumerate()
            .map(|(index, (&kind, arg))| {
                let error = |reason: String| Error::Argument {
                    kernel,
                    index: index as u32,
                    reason,
                };

                match (kind, *arg) {
                    (_, None) => Err(error("not set".to_owned())),
                    (ArgKind::Input | ArgKind::Output, Some(arg @ KernelArg::Buffer(_)))
                    | (ArgKind::F64, Some(arg @ KernelArg::F64(_)))
                    | (ArgKind::U32, Some(arg @ KernelArg::U32(_))) => Ok(arg),
                    (kind, Some(arg)) => Err(error(format!(
                        "expected {kind:?}, got {}",
                        arg.kind_name()
                    ))),
                }
            })
            .collect()
    }

    /// Records one dispatch of this kernel into `encoder`.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &[DeviceBuffer],
        workgroups: u32,
    ) -> Result<()> {
        let args = self.bound_args()?;

        let mut entries = Vec::with_capacity(args.len() + 1);
        for (index, arg) in args.iter().enumerate() {
            if let KernelArg::Buffer(id) = arg {
                let buffer = buffers.get(id.0).ok_or(Error::UnknownBuffer(id.0))?;
                entries.push(wgpu::BindGroupEntry {
                    binding: index as u32,
                    resource: buffer.buffer().as_entire_binding(),
                });
            }
        }

        let params = pack_params(&args);
        let params_buffer = (!params.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Params buffer"),
                contents: &params,
                usage: wgpu::BufferUsages::STORAGE,
            })
        });
        if let Some(params_buffer) = &params_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: PARAMS_BINDING,
                resource: params_buffer.as_entire_binding(),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.bind_group_layout,
            entries: &entries,
            label: None,
        });

        encoder.push_debug_group(self.kernel.entry_point());
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(self.kernel.entry_point()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }
        encoder.pop_debug_group();

        Ok(())
    }
}

#[inline]
fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Copies `size` bytes of `source` from `offset` into a staging buffer, submits `encoder` and
/// waits for the copy to be mapped.
pub async fn read_back(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    mut encoder: wgpu::CommandEncoder,
    source: &wgpu::Buffer,
    offset: u64,
    size: u64,
) -> Result<Vec<u8>> {
    let buffer_staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Staging buffer"),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        size,
        mapped_at_creation: false,
    });

    encoder.copy_buffer_to_buffer(source, offset, &buffer_staging, 0, size);
    queue.submit([encoder.finish()]);

    let (sender, receiver) = flume::bounded(1);

    let buffer = buffer_staging.slice(..);
    buffer.map_async(wgpu::MapMode::Read, move |r| {
        // The receiver outlives the callback unless the device was lost.
        let _ = sender.send(r);
    });

    device.poll(wgpu::Maintain::Wait);
    receiver
        .recv_async()
        .await
        .map_err(|e| Error::ReadBack(e.to_string()))?
        .map_err(|e| Error::ReadBack(e.to_string()))?;

    let view = buffer.get_mapped_range();
    let output = view.to_vec();

    drop(view);
    buffer_staging.unmap();

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::BufferId;

    #[test]
    fn workgroup_size_is_substituted() {
        for kernel in Kernel::ALL {
            let source = kernel_source(kernel, 32, None).unwrap();
            assert!(!source.contains("#WORKGROUP_SIZE"));
            assert!(source.contains("@workgroup_size(32u)"));
            assert!(source.contains(&format!("fn {}(", kernel.entry_point())));
            assert!(source.contains("fn acceleration_between("));
        }
    }

    #[test]
    fn every_kernel_validates() {
        let capabilities = naga::valid::Capabilities::FLOAT64;

        for kernel in Kernel::ALL {
            let source = kernel_source(kernel, 64, None).unwrap();
            let module = naga::front::wgsl::parse_str(&source)
                .unwrap_or_else(|e| panic!("{kernel}: {}", e.emit_to_string(&source)));

            naga::valid::Validator::new(naga::valid::ValidationFlags::all(), capabilities)
                .validate(&module)
                .unwrap_or_else(|e| panic!("{kernel}: {e:?}"));

            assert!(module
                .entry_points
                .iter()
                .any(|entry| entry.name == kernel.entry_point()));
        }
    }

    #[test]
    fn missing_override_directory() {
        let dir = Path::new("definitely/not/a/kernel/dir");
        assert!(matches!(
            kernel_source(Kernel::ShiftHistory, 1, Some(dir)),
            Err(Error::MissingKernelSource(_))
        ));
    }

    #[test]
    fn params_are_packed_in_eight_byte_slots() {
        let bytes = pack_params(&[
            KernelArg::Buffer(BufferId(0)),
            KernelArg::F64(0.5),
            KernelArg::U32(7),
            KernelArg::U32(2),
        ]);

        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..8], &0.5f64.to_le_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0; 4]);
        assert_eq!(&bytes[16..20], &2u32.to_le_bytes());
    }
}
