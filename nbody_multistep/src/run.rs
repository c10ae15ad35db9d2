//! Run loop driving a [`ComputeDevice`].
//!
//! A run builds the initial state of the configured scenario, uploads it (seeding the history
//! rings first for multistep methods) and enqueues one macro step per iteration. Positions are
//! read back every `log_every` iterations and recorded relative to the reference body.
//!
//! Buffers are created once per run. Later repeats overwrite them with the initial contents.

use crate::{
    config::RunConfig,
    dispatch::{global_size, BufferId, BufferUsage, ComputeDevice, KernelArg, KernelId},
    error::{Error, Result},
    gravity::AccelerationSweep,
    history::{builder::MultistepHistory, HistoryCursor, HistoryLayout},
    kernels::IntegrationMethod,
    output::{relative_positions, TrajectorySink},
    scenario::BodyState,
    vector::{flatten, Double4},
};
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
type HostSweep = crate::parallel::BruteForce;
#[cfg(not(feature = "parallel"))]
type HostSweep = crate::sequential::BruteForce;

const RECORD_SIZE: u64 = std::mem::size_of::<Double4>() as u64;

/// Outcome of [`Simulation::run`].
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Description of the device the run used.
    pub device: String,
    /// Integration method.
    pub method: IntegrationMethod,
    /// Number of simulated bodies.
    pub body_count: usize,
    /// Macro steps per repeat.
    pub iterations: usize,
    /// Number of repeats.
    pub repeats: usize,
    /// Wall time of every repeat together.
    pub elapsed: Duration,
    /// Positions at the end of the last repeat.
    pub final_positions: Vec<Double4>,
}

impl RunSummary {
    /// Average wall time of one repeat.
    #[inline]
    pub fn mean_run(&self) -> Duration {
        self.elapsed.div_f64(self.repeats.max(1) as f64)
    }

    /// Average wall time of one macro step.
    #[inline]
    pub fn mean_iteration(&self) -> Duration {
        self.elapsed
            .div_f64((self.repeats * self.iterations).max(1) as f64)
    }
}

/// Buffers and kernels of a run, with the stepping scheme they implement.
enum Steps {
    /// Kick-drift kernels ping-ponging between two position and two velocity buffers.
    SingleStep {
        kernel: KernelId,
        positions: [BufferId; 2],
        velocities: [BufferId; 2],
        current: usize,
    },
    /// Four stage kernels accumulating into `kx` and `kv`, then a combine into the other buffers.
    Rk4 {
        stage: KernelId,
        combine: KernelId,
        positions: [BufferId; 2],
        velocities: [BufferId; 2],
        current: usize,
    },
    /// History rings advanced in place.
    Multistep {
        integrate: KernelId,
        shift: KernelId,
        positions: BufferId,
        cursor: BufferId,
        layout: HistoryLayout,
    },
}

/// [`Steps`] and the contents its buffers hold before the first step.
struct Stepper {
    steps: Steps,
    initial: Vec<(BufferId, Vec<u8>)>,
}

fn upload<D: ComputeDevice>(device: &mut D, label: &str, values: &[f64]) -> Result<BufferId> {
    device.create_buffer(label, bytemuck::cast_slice(values), BufferUsage::ReadWrite)
}

/// Uploads `values` and remembers them so that [`Stepper::reset`] can restore them.
fn upload_initial<D: ComputeDevice>(
    device: &mut D,
    initial: &mut Vec<(BufferId, Vec<u8>)>,
    label: &str,
    values: &[f64],
) -> Result<BufferId> {
    let buffer = upload(device, label, values)?;
    initial.push((buffer, bytemuck::cast_slice(values).to_vec()));
    Ok(buffer)
}

fn bind_buffers<D: ComputeDevice>(
    device: &mut D,
    kernel: KernelId,
    buffers: &[(u32, BufferId)],
) -> Result<()> {
    buffers
        .iter()
        .try_for_each(|&(index, buffer)| device.set_arg(kernel, index, KernelArg::Buffer(buffer)))
}

impl Stepper {
    fn new<D: ComputeDevice>(
        device: &mut D,
        method: IntegrationMethod,
        kernels: &[KernelId],
        state: &BodyState,
        time_step: f64,
    ) -> Result<Self> {
        let n = state.len();
        let count = KernelArg::U32(n as u32);
        let dt = KernelArg::F64(time_step);
        let mut initial = Vec::new();
        let masses = device.create_buffer(
            "masses",
            bytemuck::cast_slice(&state.masses),
            BufferUsage::ReadOnly,
        )?;

        if let Some(scheme) = method.scheme() {
            let history = MultistepHistory::build(state, time_step, scheme, HostSweep::default())?;
            let layout = *history.layout();

            let positions = upload_initial(
                device,
                &mut initial,
                "history_positions",
                &history.flat_positions(),
            )?;
            let accelerations = upload_initial(
                device,
                &mut initial,
                "history_accelerations",
                &history.flat_accelerations(),
            )?;
            let cursor_bytes = bytemuck::bytes_of(&HistoryCursor::IDENTITY);
            let cursor =
                device.create_buffer("history_cursor", cursor_bytes, BufferUsage::ReadWrite)?;
            initial.push((cursor, cursor_bytes.to_vec()));

            let (integrate, shift) = (kernels[0], kernels[1]);
            bind_buffers(
                device,
                integrate,
                &[(0, positions), (1, accelerations), (2, masses), (3, cursor)],
            )?;
            device.set_arg(integrate, 4, dt)?;
            device.set_arg(integrate, 5, count)?;

            device.set_arg(shift, 0, KernelArg::Buffer(cursor))?;
            device.set_arg(shift, 1, KernelArg::U32(layout.position_slots() as u32))?;
            device.set_arg(shift, 2, KernelArg::U32(layout.acceleration_slots() as u32))?;

            return Ok(Self {
                steps: Steps::Multistep {
                    integrate,
                    shift,
                    positions,
                    cursor,
                    layout,
                },
                initial,
            });
        }

        let mut velocities = state.velocities.clone();
        if method == IntegrationMethod::Leapfrog {
            // Stagger the velocities half a step behind the positions.
            let accelerations = HostSweep::default().accelerations(&state.positions, &state.masses)?;
            for (velocity, acceleration) in velocities.iter_mut().zip(accelerations) {
                *velocity -= (0.5 * time_step) * acceleration;
            }
        }

        let zeros = vec![0.0; 4 * n];
        let positions = [
            upload_initial(device, &mut initial, "positions_a", &flatten(&state.positions))?,
            upload(device, "positions_b", &zeros)?,
        ];
        let velocities = [
            upload_initial(device, &mut initial, "velocities_a", &flatten(&velocities))?,
            upload(device, "velocities_b", &zeros)?,
        ];

        if method == IntegrationMethod::Rk4 {
            let stages = vec![0.0; 16 * n];
            let kx = upload(device, "rk4_kx", &stages)?;
            let kv = upload(device, "rk4_kv", &stages)?;
            let (stage, combine) = (kernels[0], kernels[1]);

            bind_buffers(device, stage, &[(2, kx), (3, kv), (4, masses)])?;
            device.set_arg(stage, 5, dt)?;
            device.set_arg(stage, 6, count)?;

            bind_buffers(device, combine, &[(2, kx), (3, kv)])?;
            device.set_arg(combine, 6, dt)?;
            device.set_arg(combine, 7, count)?;

            return Ok(Self {
                steps: Steps::Rk4 {
                    stage,
                    combine,
                    positions,
                    velocities,
                    current: 0,
                },
                initial,
            });
        }

        let kernel = kernels[0];
        device.set_arg(kernel, 4, KernelArg::Buffer(masses))?;
        device.set_arg(kernel, 5, dt)?;
        device.set_arg(kernel, 6, count)?;

        Ok(Self {
            steps: Steps::SingleStep {
                kernel,
                positions,
                velocities,
                current: 0,
            },
            initial,
        })
    }

    /// Restores the buffers to their contents before the first step.
    fn reset<D: ComputeDevice>(&mut self, device: &mut D) -> Result<()> {
        for (buffer, contents) in &self.initial {
            device.write_buffer(*buffer, 0, contents)?;
        }

        match &mut self.steps {
            Steps::SingleStep { current, .. } | Steps::Rk4 { current, .. } => *current = 0,
            Steps::Multistep { .. } => {}
        }

        Ok(())
    }

    /// Enqueues one macro step.
    fn step<D: ComputeDevice>(&mut self, device: &mut D, global: u32, local: u32) -> Result<()> {
        match &mut self.steps {
            Steps::SingleStep {
                kernel,
                positions,
                velocities,
                current,
            } => {
                let (from, to) = (*current, 1 - *current);
                bind_buffers(
                    device,
                    *kernel,
                    &[
                        (0, positions[from]),
                        (1, velocities[from]),
                        (2, positions[to]),
                        (3, velocities[to]),
                    ],
                )?;
                device.enqueue(*kernel, global, local)?;
                *current = to;
            }
            Steps::Rk4 {
                stage,
                combine,
                positions,
                velocities,
                current,
            } => {
                let (from, to) = (*current, 1 - *current);
                bind_buffers(device, *stage, &[(0, positions[from]), (1, velocities[from])])?;
                for s in 0..4 {
                    device.set_arg(*stage, 7, KernelArg::U32(s))?;
                    device.enqueue(*stage, global, local)?;
                }

                bind_buffers(
                    device,
                    *combine,
                    &[
                        (0, positions[from]),
                        (1, velocities[from]),
                        (4, positions[to]),
                        (5, velocities[to]),
                    ],
                )?;
                device.enqueue(*combine, global, local)?;
                *current = to;
            }
            Steps::Multistep {
                integrate, shift, ..
            } => {
                device.enqueue(*integrate, global, local)?;
                device.enqueue(*shift, global_size(1, local), local)?;
            }
        }

        Ok(())
    }

    /// Blocks until every enqueued step completed and returns the present positions.
    fn positions<D: ComputeDevice>(&self, device: &mut D, body_count: usize) -> Result<Vec<Double4>> {
        let size = body_count as u64 * RECORD_SIZE;
        let bytes = match &self.steps {
            Steps::SingleStep {
                positions, current, ..
            }
            | Steps::Rk4 {
                positions, current, ..
            } => device.read_buffer(positions[*current], 0, size)?,
            Steps::Multistep {
                positions,
                cursor,
                layout,
                ..
            } => {
                let cursor: HistoryCursor = bytemuck::pod_read_unaligned(&device.read_buffer(
                    *cursor,
                    0,
                    std::mem::size_of::<HistoryCursor>() as u64,
                )?);
                let slot = cursor.physical_position_slot(1, layout.position_slots());
                let offset = layout.index(slot, 0) as u64 * RECORD_SIZE;
                device.read_buffer(*positions, offset, size)?
            }
        };

        Ok(bytes
            .chunks_exact(RECORD_SIZE as usize)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

/// A configured simulation bound to a device and a trajectory sink.
pub struct Simulation<D, S> {
    config: RunConfig,
    device: D,
    sink: S,
}

impl<D: ComputeDevice, S: TrajectorySink> Simulation<D, S> {
    /// Creates a new [`Simulation`], rejecting invalid configurations.
    pub fn new(config: RunConfig, device: D, sink: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            device,
            sink,
        })
    }

    /// The run configuration.
    #[inline]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Consumes the simulation and returns its sink.
    #[inline]
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs the configured scenario.
    pub fn run(&mut self) -> Result<RunSummary> {
        let state = self.config.scenario().bodies(self.config.body_count);
        self.run_state(&state)
    }

    /// Runs the configured method from `state` instead of the configured scenario.
    ///
    /// Only the first repeat is recorded to the sink. Every repeat restarts from `state`.
    pub fn run_state(&mut self, state: &BodyState) -> Result<RunSummary> {
        let Self {
            config,
            device,
            sink,
        } = self;

        if state.is_empty() {
            return Err(Error::Config("no bodies to simulate".to_owned()));
        }

        let n = state.len();
        let count = u32::try_from(n)
            .map_err(|_| Error::Config(format!("{n} bodies exceed the device index range")))?;
        let (method, dt) = (config.method, config.time_step);
        let local = config.local_size;
        let global = global_size(count, local);

        let kernels = method
            .kernels()
            .iter()
            .map(|kernel| device.create_kernel(kernel.entry_point()))
            .collect::<Result<Vec<_>>>()?;

        let mut stepper = Stepper::new(device, method, &kernels, state, dt)?;

        log::info!(
            "starting {} with {n} bodies on {} for {} iterations",
            method,
            device.name(),
            config.iterations
        );

        let start = Instant::now();
        let mut final_positions = state.positions.clone();

        for repeat in 0..config.repeat {
            let logging = repeat == 0;
            if logging {
                record(sink, 0.0, &state.positions, config.reference_frame)?;
            } else {
                stepper.reset(device)?;
            }

            for iteration in 0..config.iterations {
                stepper.step(device, global, local)?;

                if logging && iteration % config.log_every == 0 {
                    let positions = stepper.positions(device, n)?;
                    let time = (iteration + 1) as f64 * dt;
                    record(sink, time, &positions, config.reference_frame)?;
                }
            }

            final_positions = stepper.positions(device, n)?;
            device.finish()?;
            log::debug!("repeat {repeat} done after {:?}", start.elapsed());
        }

        let summary = RunSummary {
            device: device.name(),
            method,
            body_count: n,
            iterations: config.iterations,
            repeats: config.repeat,
            elapsed: start.elapsed(),
            final_positions,
        };

        sink.flush()?;

        log::info!(
            "finished in {:?}: {} iterations of {} on {} bodies, logged every {} iterations, \
             {} repeats, {:?} per run, {:?} per iteration",
            summary.elapsed,
            summary.iterations,
            summary.method,
            summary.body_count,
            config.log_every,
            summary.repeats,
            summary.mean_run(),
            summary.mean_iteration()
        );

        Ok(summary)
    }
}

fn record<S: TrajectorySink>(
    sink: &mut S,
    time: f64,
    positions: &[Double4],
    reference_frame: Option<usize>,
) -> Result<()> {
    for (body, position) in relative_positions(positions, reference_frame)?
        .into_iter()
        .enumerate()
    {
        sink.record(time, body, position)?;
    }

    Ok(())
}
