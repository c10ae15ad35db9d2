use crate::{
    error::Result,
    gravity::{total_acceleration, AccelerationSweep},
    vector::Double4,
};

/// Brute-force [`AccelerationSweep`] on a single thread.
///
/// Every body is compared against every other body, `O(N²)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl AccelerationSweep for BruteForce {
    #[inline]
    fn sweep(&self, positions: &[Double4], masses: &[f64], out: &mut [Double4]) -> Result<()> {
        for (id, acceleration) in out.iter_mut().enumerate() {
            *acceleration = total_acceleration(positions, masses, id)?;
        }

        Ok(())
    }
}
