use crate::{
    error::Result,
    gravity::{total_acceleration, AccelerationSweep},
    history::{builder::MultistepHistory, MultistepScheme},
    scenario::BodyState,
    vector::Double4,
};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

/// Brute-force [`AccelerationSweep`] using multiple CPU threads through rayon.
///
/// Each body is summed in the same order as [`sequential::BruteForce`](crate::sequential::BruteForce),
/// so both return bit-identical accelerations.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl AccelerationSweep for BruteForce {
    #[inline]
    fn sweep(&self, positions: &[Double4], masses: &[f64], out: &mut [Double4]) -> Result<()> {
        out.par_iter_mut()
            .enumerate()
            .try_for_each(|(id, acceleration)| {
                *acceleration = total_acceleration(positions, masses, id)?;
                Ok(())
            })
    }
}

/// Builds the multistep history of `state`, sweeping accelerations in parallel.
#[inline]
pub fn build_history(
    state: &BodyState,
    time_step: f64,
    scheme: MultistepScheme,
) -> Result<MultistepHistory> {
    MultistepHistory::build(state, time_step, scheme, BruteForce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gravity::tests, scenario::Scenario, sequential};

    #[test]
    fn brute_force() {
        tests::acceleration_error(BruteForce, 1e-12);
    }

    #[test]
    fn matches_sequential() {
        let (positions, masses) = tests::random_system(200, 11);

        let parallel = BruteForce.accelerations(&positions, &masses).unwrap();
        let sequential = sequential::BruteForce
            .accelerations(&positions, &masses)
            .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn history_matches_sequential() {
        let state = Scenario::EarthMoonSatellites.bodies(12);

        let parallel = build_history(&state, 10.0, MultistepScheme::FivePoint).unwrap();
        let sequential = MultistepHistory::build(
            &state,
            10.0,
            MultistepScheme::FivePoint,
            sequential::BruteForce,
        )
        .unwrap();

        assert_eq!(parallel.positions(), sequential.positions());
        assert_eq!(parallel.accelerations(), sequential.accelerations());
    }
}
