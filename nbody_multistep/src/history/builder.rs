use crate::{
    error::Result,
    gravity::AccelerationSweep,
    history::{reconstruct, HistoryLayout, MultistepScheme},
    scenario::BodyState,
    vector::{flatten, Double4},
};

/// Initial contents of the position and acceleration rings of a multistep method.
///
/// Position slot 0 (future) and acceleration slot 0 are zero, position slot 1 holds the current
/// positions and position slot `k + 1` the positions `k` macro steps in the past. Acceleration slot
/// `k` holds the accelerations `k` macro steps in the past.
#[derive(Clone, Debug, PartialEq)]
pub struct MultistepHistory {
    layout: HistoryLayout,
    positions: Vec<Double4>,
    accelerations: Vec<Double4>,
    masses: Vec<f64>,
}

impl MultistepHistory {
    /// Reconstructs the past of `state` and assembles the rings for `scheme`.
    pub fn build(
        state: &BodyState,
        time_step: f64,
        scheme: MultistepScheme,
        sweep: impl AccelerationSweep,
    ) -> Result<Self> {
        let layout = HistoryLayout::new(scheme, state.len());
        let offsets: Vec<u32> = (1..=layout.position_slots() as u32 - 2).collect();

        log::debug!(
            "seeding {scheme:?} history of {} bodies over {} offsets",
            state.len(),
            offsets.len()
        );

        let past = reconstruct::positions_at_offsets(state, &offsets, time_step, &sweep)?;

        let past_accelerations = past
            .iter()
            .take(layout.acceleration_slots() - 1)
            .map(|positions| sweep.accelerations(positions, &state.masses))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::assemble(
            layout,
            &state.positions,
            &past,
            &past_accelerations,
            state.masses.clone(),
        ))
    }

    /// Lays out already computed samples into the rings.
    ///
    /// `past[k]` are the positions `k + 1` steps ago and `past_accelerations[k]` the
    /// accelerations `k + 1` steps ago. Missing samples leave their slots zeroed.
    pub fn assemble(
        layout: HistoryLayout,
        current: &[Double4],
        past: &[Vec<Double4>],
        past_accelerations: &[Vec<Double4>],
        masses: Vec<f64>,
    ) -> Self {
        let mut positions = vec![Double4::ZERO; layout.position_len()];
        let mut accelerations = vec![Double4::ZERO; layout.acceleration_len()];

        let position_samples = std::iter::once(current).chain(past.iter().map(Vec::as_slice));
        for (slot, sample) in (1..layout.position_slots()).zip(position_samples) {
            let start = layout.index(slot, 0);
            positions[start..start + layout.body_count].copy_from_slice(sample);
        }

        for (slot, sample) in (1..layout.acceleration_slots()).zip(past_accelerations) {
            let start = layout.index(slot, 0);
            accelerations[start..start + layout.body_count].copy_from_slice(sample);
        }

        Self {
            layout,
            positions,
            accelerations,
            masses,
        }
    }

    /// Shape of the rings.
    #[inline]
    pub const fn layout(&self) -> &HistoryLayout {
        &self.layout
    }

    /// Position ring, `H × N` records.
    #[inline]
    pub fn positions(&self) -> &[Double4] {
        &self.positions
    }

    /// Acceleration ring, `A × N` records.
    #[inline]
    pub fn accelerations(&self) -> &[Double4] {
        &self.accelerations
    }

    /// Gravitational parameters, unchanged from the initial state.
    #[inline]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Position ring as the `4 × H × N` doubles uploaded to the device.
    #[inline]
    pub fn flat_positions(&self) -> Vec<f64> {
        flatten(&self.positions)
    }

    /// Acceleration ring as the `4 × A × N` doubles uploaded to the device.
    #[inline]
    pub fn flat_accelerations(&self) -> Vec<f64> {
        flatten(&self.accelerations)
    }
}
