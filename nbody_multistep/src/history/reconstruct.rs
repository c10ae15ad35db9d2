use crate::{error::Result, gravity::AccelerationSweep, scenario::BodyState, vector::Double4};

/// Number of leapfrog sub-steps per macro time step.
pub const SUB_STEPS: u32 = 512;

/// Leapfrog integrator running backward in time with a step of `time_step / SUB_STEPS`.
struct BackwardLeapfrog<'a, S> {
    positions: Vec<Double4>,
    velocities: Vec<Double4>,
    accelerations: Vec<Double4>,
    masses: &'a [f64],
    delta: f64,
    sweep: S,
}

impl<'a, S: AccelerationSweep> BackwardLeapfrog<'a, S> {
    /// Starts the walk at `state` with the initial half kick already applied.
    fn new(state: &'a BodyState, time_step: f64, sweep: S) -> Result<Self> {
        let mut walker = Self {
            positions: state.positions.clone(),
            velocities: state.velocities.clone(),
            accelerations: vec![Double4::ZERO; state.len()],
            masses: &state.masses,
            delta: time_step / SUB_STEPS as f64,
            sweep,
        };

        walker.kick(-walker.delta * 0.5)?;
        Ok(walker)
    }

    #[inline]
    fn kick(&mut self, dt: f64) -> Result<()> {
        self.sweep
            .sweep(&self.positions, self.masses, &mut self.accelerations)?;

        for (velocity, &acceleration) in self.velocities.iter_mut().zip(&self.accelerations) {
            *velocity += dt * acceleration;
        }

        Ok(())
    }

    #[inline]
    fn drift(&mut self, dt: f64) {
        for (position, &velocity) in self.positions.iter_mut().zip(&self.velocities) {
            *position += dt * velocity;
        }
    }

    /// One full sub-step: drift, then kick at the drifted positions.
    #[inline]
    fn step(&mut self) -> Result<()> {
        self.drift(-self.delta);
        self.kick(-self.delta)
    }
}

/// Returns the positions of `state` integrated `offset` macro steps into the past.
///
/// Uses a leapfrog integrator with `offset * SUB_STEPS` steps of `time_step / SUB_STEPS`.
/// Velocities are discarded. An offset of 0 returns the positions unchanged.
#[inline]
pub fn positions_at_offset(
    state: &BodyState,
    offset: u32,
    time_step: f64,
    sweep: impl AccelerationSweep,
) -> Result<Vec<Double4>> {
    let mut samples = positions_at_offsets(state, &[offset], time_step, sweep)?;
    Ok(samples.swap_remove(0))
}

/// Returns the positions of `state` at every offset of `offsets`, in the order given.
///
/// The walk is performed once up to the largest offset. Every sample is bit-identical to the
/// result of [`positions_at_offset`] for the same offset.
pub fn positions_at_offsets(
    state: &BodyState,
    offsets: &[u32],
    time_step: f64,
    sweep: impl AccelerationSweep,
) -> Result<Vec<Vec<Double4>>> {
    let mut samples = vec![Vec::new(); offsets.len()];
    let furthest = offsets.iter().copied().max().unwrap_or(0);

    for (sample, _) in samples.iter_mut().zip(offsets).filter(|&(_, &o)| o == 0) {
        sample.clone_from(&state.positions);
    }

    if furthest == 0 {
        return Ok(samples);
    }

    let mut walker = BackwardLeapfrog::new(state, time_step, sweep)?;
    let mut steps = 0u64;

    for offset in 1..=furthest {
        let target = offset as u64 * SUB_STEPS as u64;
        while steps < target {
            walker.step()?;
            steps += 1;
        }

        log::trace!("reconstructed offset {offset}");
        for (sample, _) in samples.iter_mut().zip(offsets).filter(|&(_, &o)| o == offset) {
            sample.clone_from(&walker.positions);
        }
    }

    Ok(samples)
}
