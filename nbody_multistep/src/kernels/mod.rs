//! Catalogue of the integration kernels, their argument signatures and the multistep
//! coefficients they use.

/// Reference bodies of every kernel, run by [`HostDevice`](crate::host::HostDevice).
pub mod host;

use crate::{
    error::{Error, Result},
    history::MultistepScheme,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kind of a kernel argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    /// Buffer only read by the kernel.
    Input,
    /// Buffer written, and possibly read, by the kernel.
    Output,
    /// Double precision scalar.
    F64,
    /// Unsigned 32-bit scalar.
    U32,
}

impl ArgKind {
    /// Returns `true` for buffer arguments.
    #[inline]
    pub const fn is_buffer(self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }
}

/// Every kernel entry point known to the devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Symplectic Euler step, kick then drift.
    IntegrateEuler,
    /// Leapfrog step on half-step staggered velocities.
    IntegrateLeapfrog,
    /// One of the four derivative evaluations of a classical Runge-Kutta step.
    Rk4Stage,
    /// Weighted sum of the four Runge-Kutta stages.
    Rk4Combine,
    /// Five-point symmetric multistep step.
    IntegrateM52,
    /// Fifteen-point symmetric multistep step.
    IntegrateM157,
    /// Advances the history cursor by one slot.
    ShiftHistory,
}

use ArgKind::{Input, Output, F64, U32};

const SINGLE_STEP_ARGS: &[ArgKind] = &[Input, Input, Output, Output, Input, F64, U32];
const RK4_STAGE_ARGS: &[ArgKind] = &[Input, Input, Output, Output, Input, F64, U32, U32];
const RK4_COMBINE_ARGS: &[ArgKind] = &[Input, Input, Input, Input, Output, Output, F64, U32];
const MULTISTEP_ARGS: &[ArgKind] = &[Output, Output, Input, Input, F64, U32];
const SHIFT_ARGS: &[ArgKind] = &[Output, U32, U32];

impl Kernel {
    /// All kernels, in catalogue order.
    pub const ALL: [Self; 7] = [
        Self::IntegrateEuler,
        Self::IntegrateLeapfrog,
        Self::Rk4Stage,
        Self::Rk4Combine,
        Self::IntegrateM52,
        Self::IntegrateM157,
        Self::ShiftHistory,
    ];

    /// Name of the entry point in the kernel source.
    #[inline]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::IntegrateEuler => "integrate_euler",
            Self::IntegrateLeapfrog => "integrate_leapfrog",
            Self::Rk4Stage => "rk4_stage",
            Self::Rk4Combine => "rk4_combine",
            Self::IntegrateM52 => "integrate_m52",
            Self::IntegrateM157 => "integrate_m157",
            Self::ShiftHistory => "shift_history",
        }
    }

    /// Resolves an entry point name.
    pub fn from_entry_point(entry_point: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kernel| kernel.entry_point() == entry_point)
            .ok_or_else(|| Error::UnknownKernel(entry_point.to_owned()))
    }

    /// Kinds of the arguments, indexed by argument index.
    #[inline]
    pub const fn signature(self) -> &'static [ArgKind] {
        match self {
            Self::IntegrateEuler | Self::IntegrateLeapfrog => SINGLE_STEP_ARGS,
            Self::Rk4Stage => RK4_STAGE_ARGS,
            Self::Rk4Combine => RK4_COMBINE_ARGS,
            Self::IntegrateM52 | Self::IntegrateM157 => MULTISTEP_ARGS,
            Self::ShiftHistory => SHIFT_ARGS,
        }
    }
}

impl fmt::Display for Kernel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// Time integration scheme of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationMethod {
    /// First order symplectic Euler.
    #[default]
    SymplecticEuler,
    /// Second order leapfrog.
    Leapfrog,
    /// Classical fourth order Runge-Kutta.
    Rk4,
    /// Fourth order symmetric multistep, 5 position slots.
    #[serde(rename = "multistep5")]
    Multistep5,
    /// Fourteenth order symmetric multistep, 15 position slots.
    #[serde(rename = "multistep15")]
    Multistep15,
}

impl IntegrationMethod {
    /// All methods.
    pub const ALL: [Self; 5] = [
        Self::SymplecticEuler,
        Self::Leapfrog,
        Self::Rk4,
        Self::Multistep5,
        Self::Multistep15,
    ];

    /// Kernels enqueued, in order, for one macro step.
    #[inline]
    pub const fn kernels(self) -> &'static [Kernel] {
        match self {
            Self::SymplecticEuler => &[Kernel::IntegrateEuler],
            Self::Leapfrog => &[Kernel::IntegrateLeapfrog],
            Self::Rk4 => &[Kernel::Rk4Stage, Kernel::Rk4Combine],
            Self::Multistep5 => &[Kernel::IntegrateM52, Kernel::ShiftHistory],
            Self::Multistep15 => &[Kernel::IntegrateM157, Kernel::ShiftHistory],
        }
    }

    /// History scheme of multistep methods.
    #[inline]
    pub const fn scheme(self) -> Option<MultistepScheme> {
        match self {
            Self::Multistep5 => Some(MultistepScheme::FivePoint),
            Self::Multistep15 => Some(MultistepScheme::FifteenPoint),
            _ => None,
        }
    }

    /// Selector used in configuration files.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SymplecticEuler => "symplectic-euler",
            Self::Leapfrog => "leapfrog",
            Self::Rk4 => "rk4",
            Self::Multistep5 => "multistep5",
            Self::Multistep15 => "multistep15",
        }
    }
}

impl fmt::Display for IntegrationMethod {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegrationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown integration method `{s}`")))
    }
}

/// Stage times of the classical Runge-Kutta method, as fractions of the step.
pub const RK4_STAGE_TIMES: [f64; 4] = [0.0, 0.5, 0.5, 1.0];

/// Weights of the Runge-Kutta stages in the final combination, to be divided by 6.
pub const RK4_WEIGHTS: [f64; 4] = [1.0, 2.0, 2.0, 1.0];

/// Position coefficients of the five-point method, for logical position slots `1..5`.
pub const M52_POSITION: [f64; 4] = [2.0, -2.0, 2.0, -1.0];

/// Acceleration coefficients of the five-point method, for logical acceleration slots `0..3`.
pub const M52_ACCELERATION: [f64; 3] = [7.0 / 6.0, -1.0 / 3.0, 7.0 / 6.0];

/// Position coefficients of the fifteen-point method, for logical position slots `1..15`.
pub const M157_POSITION: [f64; 14] = [
    2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -1.0,
];

const M157_B1: f64 = 681136420843.0 / 373621248000.0;
const M157_B2: f64 = -44626296457.0 / 7783776000.0;
const M157_B3: f64 = 1456500260693.0 / 62270208000.0;
const M157_B4: f64 = -281942231099.0 / 4670265600.0;
const M157_B5: f64 = 110975241329.0 / 922521600.0;
const M157_B6: f64 = -230674060327.0 / 1297296000.0;
const M157_B7: f64 = 906526993733.0 / 4447872000.0;

/// Acceleration coefficients of the fifteen-point method, for logical acceleration slots
/// `0..13`.
pub const M157_ACCELERATION: [f64; 13] = [
    M157_B1, M157_B2, M157_B3, M157_B4, M157_B5, M157_B6, M157_B7, M157_B6, M157_B5, M157_B4,
    M157_B3, M157_B2, M157_B1,
];

/// Coefficients of a symmetric multistep method.
#[derive(Clone, Copy, Debug)]
pub struct MultistepCoefficients {
    /// Weights of logical position slots `1..H`.
    pub position: &'static [f64],
    /// Weights of logical acceleration slots `0..A`, multiplied by `Δt²`.
    pub acceleration: &'static [f64],
}

impl MultistepScheme {
    /// Returns the coefficients of this scheme.
    #[inline]
    pub const fn coefficients(self) -> MultistepCoefficients {
        match self {
            Self::FivePoint => MultistepCoefficients {
                position: &M52_POSITION,
                acceleration: &M52_ACCELERATION,
            },
            Self::FifteenPoint => MultistepCoefficients {
                position: &M157_POSITION,
                acceleration: &M157_ACCELERATION,
            },
        }
    }

    /// Kernel stepping this scheme.
    #[inline]
    pub const fn kernel(self) -> Kernel {
        match self {
            Self::FivePoint => Kernel::IntegrateM52,
            Self::FifteenPoint => Kernel::IntegrateM157,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A method is exact for `x(t) = t^q` when the position combination matches the second
    // derivative combination. `t` is measured from the middle of the stencil to keep the powers
    // small.
    fn order_error(scheme: MultistepScheme, q: i32) -> f64 {
        let k = scheme.position_slots() as f64 - 1.0;
        let coefficients = scheme.coefficients();
        let t = |slot: usize| k - slot as f64 - k / 2.0;

        // Slot `j` of the position ring sits at step `k - j` of the stencil, slot 0 at step `k`.
        let lhs = t(0).powi(q)
            - coefficients
                .position
                .iter()
                .enumerate()
                .map(|(j, c)| c * t(j + 1).powi(q))
                .sum::<f64>();

        // Acceleration slot `j` is sampled at the same time as position slot `j + 1`.
        let rhs = if q < 2 {
            0.0
        } else {
            coefficients
                .acceleration
                .iter()
                .enumerate()
                .map(|(j, b)| b * (q * (q - 1)) as f64 * t(j + 1).powi(q - 2))
                .sum::<f64>()
        };

        let scale = (0..=k as usize).map(|s| t(s).abs().powi(q)).sum::<f64>().max(1.0);
        (lhs - rhs).abs() / scale
    }

    #[test]
    fn five_point_is_fourth_order() {
        for q in 0..=5 {
            assert!(order_error(MultistepScheme::FivePoint, q) < 1e-14, "q = {q}");
        }
        assert!(order_error(MultistepScheme::FivePoint, 6) > 1e-3);
    }

    #[test]
    fn fifteen_point_is_fourteenth_order() {
        for q in 0..=15 {
            let error = order_error(MultistepScheme::FifteenPoint, q);
            assert!(error < 1e-9, "q = {q}: {error}");
        }
    }

    #[test]
    fn coefficients_are_symmetric() {
        for scheme in [MultistepScheme::FivePoint, MultistepScheme::FifteenPoint] {
            let b = scheme.coefficients().acceleration;
            assert!(b.iter().eq(b.iter().rev()));
            assert_eq!(scheme.coefficients().position.len(), scheme.position_slots() - 1);
            assert_eq!(b.len(), scheme.acceleration_slots());
        }
    }

    #[test]
    fn entry_points_resolve() {
        for kernel in Kernel::ALL {
            assert_eq!(Kernel::from_entry_point(kernel.entry_point()).unwrap(), kernel);
        }
        assert!(matches!(
            Kernel::from_entry_point("integrate_verlet"),
            Err(Error::UnknownKernel(_))
        ));
    }

    #[test]
    fn method_names() {
        for method in IntegrationMethod::ALL {
            assert_eq!(method.name().parse::<IntegrationMethod>().unwrap(), method);
        }
        assert_eq!(
            serde_yaml::from_str::<IntegrationMethod>("multistep15").unwrap(),
            IntegrationMethod::Multistep15
        );
        assert_eq!(
            serde_yaml::from_str::<IntegrationMethod>("symplectic-euler").unwrap(),
            IntegrationMethod::SymplecticEuler
        );
        assert!("verlet".parse::<IntegrationMethod>().is_err());
    }
}
