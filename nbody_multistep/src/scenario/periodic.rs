use serde::{Deserialize, Serialize};

/// Known periodic solutions of the planar three-body problem, in units where `G = 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodicOrbit {
    /// Figure-eight orbit of three equal masses.
    Infinity,
    /// Li-Liao unequal-mass orbit `II.C.2d` with masses `1, 1, 2`.
    LiLiaoUe2d,
}

/// Initial conditions of one [`PeriodicOrbit`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicOrbitData {
    /// Body positions.
    pub positions: [[f64; 3]; 3],
    /// Body velocities.
    pub velocities: [[f64; 3]; 3],
    /// Body masses.
    pub masses: [f64; 3],
}

const COLLINEAR: [[f64; 3]; 3] = [[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]];

const INFINITY: PeriodicOrbitData = PeriodicOrbitData {
    positions: COLLINEAR,
    velocities: [
        [0.3471168881, 0.5327249454, 0.0],
        [0.3471168881, 0.5327249454, 0.0],
        [-0.6942337762, -1.0654498908, 0.0],
    ],
    masses: [1.0, 1.0, 1.0],
};

const LI_LIAO_UE2D: PeriodicOrbitData = PeriodicOrbitData {
    positions: COLLINEAR,
    velocities: [
        [0.7583850283, 0.9342270211, 0.0],
        [0.7583850283, 0.9342270211, 0.0],
        [-0.7583850283, -0.9342270211, 0.0],
    ],
    masses: [1.0, 1.0, 2.0],
};

impl PeriodicOrbit {
    /// Returns the literal initial conditions of this orbit.
    #[inline]
    pub const fn data(self) -> &'static PeriodicOrbitData {
        match self {
            Self::Infinity => &INFINITY,
            Self::LiLiaoUe2d => &LI_LIAO_UE2D,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_momentum_is_zero() {
        for orbit in [PeriodicOrbit::Infinity, PeriodicOrbit::LiLiaoUe2d] {
            let data = orbit.data();
            for k in 0..3 {
                let momentum: f64 = (0..3).map(|i| data.masses[i] * data.velocities[i][k]).sum();
                assert!(momentum.abs() < 1e-12, "{orbit:?}: {momentum}");
            }
        }
    }
}
