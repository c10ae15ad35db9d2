use crate::{
    error::{Error, Result},
    vector::Double4,
};

/// Gravitational constant used to premultiply every scenario mass.
pub const G: f64 = 6.674315e-11;

/// Returns the acceleration exerted on a body at `position` by a body of gravitational parameter
/// `mu` at `other`.
///
/// There is no softening: two bodies at the exact same position fail with
/// [`Error::DivisionByZero`].
#[inline]
pub fn acceleration_between(position: Double4, other: Double4, mu: f64) -> Result<Double4> {
    let dir = other - position;
    let norm_squared = dir.dot3(dir);

    if norm_squared == 0.0 {
        return Err(Error::DivisionByZero);
    }

    Ok(dir * (mu / (norm_squared * norm_squared.sqrt())))
}

/// Returns the total acceleration of body `id` due to every other body.
///
/// `positions` and `masses` must have the same length and `id` must index into them.
#[inline]
pub fn total_acceleration(positions: &[Double4], masses: &[f64], id: usize) -> Result<Double4> {
    let position = positions[id];

    positions
        .iter()
        .zip(masses)
        .enumerate()
        .filter(|&(j, _)| j != id)
        .try_fold(Double4::ZERO, |acc, (_, (&other, &mu))| {
            Ok(acc + acceleration_between(position, other, mu)?)
        })
}

/// Algorithm computing the accelerations of every body of a system at once.
pub trait AccelerationSweep {
    /// Writes the acceleration of body `i` into `out[i]`.
    ///
    /// `positions`, `masses` and `out` must have the same length.
    fn sweep(&self, positions: &[Double4], masses: &[f64], out: &mut [Double4]) -> Result<()>;

    /// Returns a newly allocated vector with the accelerations of every body.
    #[inline]
    fn accelerations(&self, positions: &[Double4], masses: &[f64]) -> Result<Vec<Double4>> {
        let mut out = vec![Double4::ZERO; positions.len()];
        self.sweep(positions, masses, &mut out)?;
        Ok(out)
    }
}

impl<S: AccelerationSweep + ?Sized> AccelerationSweep for &S {
    #[inline]
    fn sweep(&self, positions: &[Double4], masses: &[f64], out: &mut [Double4]) -> Result<()> {
        (**self).sweep(positions, masses, out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    pub fn random_system(count: usize, seed: u64) -> (Vec<Double4>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..count)
            .map(|_| {
                Double4::new(
                    rng.gen_range(-1e3..1e3),
                    rng.gen_range(-1e3..1e3),
                    rng.gen_range(-1e3..1e3),
                )
            })
            .collect();
        let masses = (0..count).map(|_| rng.gen_range(1.0..1e6)).collect();

        (positions, masses)
    }

    pub fn acceleration_error(sweep: impl AccelerationSweep, epsilon: f64) {
        let (positions, masses) = random_system(64, 7);
        let computed = sweep.accelerations(&positions, &masses).unwrap();

        for (i, &computed) in computed.iter().enumerate() {
            let mut expected = [0.0; 3];
            for (j, (&other, &mu)) in positions.iter().zip(&masses).enumerate() {
                if i == j {
                    continue;
                }

                let dir = (other - positions[i]).to_array();
                let d2 = dir.iter().map(|d| d * d).sum::<f64>();
                let d3 = d2 * d2.sqrt();
                for k in 0..3 {
                    expected[k] += mu * dir[k] / d3;
                }
            }

            let expected = Double4::from(expected);
            let diff = computed - expected;
            let error = (diff.dot3(diff) / expected.dot3(expected)).sqrt();
            assert!(error <= epsilon, "body {i}: relative error {error}");
        }
    }

    #[test]
    fn equal_masses_attract_with_inverse_square() {
        let d = 4.0;
        let m = 3.0;
        let a = Double4::new(1.0, 2.0, 3.0);
        let b = a + Double4::new(d, 0.0, 0.0);

        let on_a = acceleration_between(a, b, m).unwrap();
        let on_b = acceleration_between(b, a, m).unwrap();

        assert_eq!(on_a, Double4::new(m / (d * d), 0.0, 0.0));
        assert_eq!(on_b, -on_a);
    }

    #[test]
    fn total_acceleration_skips_self() {
        let positions = [
            Double4::ZERO,
            Double4::new(0.0, 2.0, 0.0),
            Double4::new(0.0, -2.0, 0.0),
        ];
        let masses = [5.0, 1.0, 1.0];

        // Symmetric neighbours cancel out exactly.
        assert_eq!(total_acceleration(&positions, &masses, 0).unwrap(), Double4::ZERO);

        let top = total_acceleration(&positions, &masses, 1).unwrap();
        assert_eq!(top, Double4::new(0.0, -5.0 / 4.0 - 1.0 / 16.0, 0.0));
    }

    #[test]
    fn coincident_bodies_fail() {
        let positions = [Double4::splat(1.0), Double4::splat(1.0)];
        assert!(matches!(
            total_acceleration(&positions, &[1.0, 1.0], 0),
            Err(Error::DivisionByZero)
        ));
    }
}
