/// Literal initial conditions of periodic three-body orbits.
pub mod periodic;
mod solar_system;

pub use periodic::PeriodicOrbit;

use crate::{gravity::G, vector::Double4};

/// Single-step snapshot of a system: one position, velocity and gravitational parameter per body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyState {
    /// Positions of the bodies.
    pub positions: Vec<Double4>,
    /// Velocities of the bodies.
    pub velocities: Vec<Double4>,
    /// Masses of the bodies, premultiplied by [`G`] where the scenario is in SI units.
    pub masses: Vec<f64>,
}

impl BodyState {
    /// Creates an empty [`BodyState`] with room for `capacity` bodies.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
            masses: Vec::with_capacity(capacity),
        }
    }

    /// Appends a body.
    #[inline]
    pub fn push(&mut self, position: Double4, velocity: Double4, mass: f64) {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.masses.push(mass);
    }

    /// Number of bodies.
    #[inline]
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    /// Returns `true` if there are no bodies.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

/// Initial condition of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Earth and Moon followed by a fan of satellites in low Earth orbit.
    #[default]
    EarthMoonSatellites,
    /// The Sun and nine planets. Always 10 bodies.
    SolarSystem,
    /// A periodic three-body orbit. Always 3 bodies.
    Periodic(PeriodicOrbit),
}

const EARTH_MASS: f64 = 5.97219e24;
const MOON_MASS: f64 = 7.348e22;
const MOON_POSITION: [f64; 3] = [
    -3.679525311419403E+08,
    1.665317952836706E+08,
    2.517731761270612E+07,
];
const MOON_VELOCITY: [f64; 3] = [
    -4.097678496220849E+02,
    -8.756270441426266E+02,
    -5.926517055394465E+01,
];
const SATELLITE_MASS: f64 = 1200.0;
const SATELLITE_RADIUS: f64 = 6_571_000.0;

impl Scenario {
    /// Resolves a selector such as `solar-system` or `infinity`.
    ///
    /// Unknown selectors resolve to [`Scenario::EarthMoonSatellites`].
    pub fn from_selector(selector: &str) -> Self {
        match selector.trim().to_ascii_lowercase().as_str() {
            "earth-moon-satellites" | "two-body-satellites" => Self::EarthMoonSatellites,
            "solar-system" => Self::SolarSystem,
            "infinity" => Self::Periodic(PeriodicOrbit::Infinity),
            "li-liao-ue2d" => Self::Periodic(PeriodicOrbit::LiLiaoUe2d),
            other => {
                log::warn!("unknown scenario `{other}`, falling back to earth-moon-satellites");
                Self::EarthMoonSatellites
            }
        }
    }

    /// Builds the initial state of this scenario.
    ///
    /// `body_count` is only used by [`Scenario::EarthMoonSatellites`]; the other scenarios have a
    /// fixed number of bodies.
    pub fn bodies(self, body_count: usize) -> BodyState {
        let state = match self {
            Self::EarthMoonSatellites => earth_moon_satellites(body_count),
            Self::SolarSystem => solar_system(),
            Self::Periodic(orbit) => periodic(orbit),
        };

        log::debug!("{self:?}: {} bodies", state.len());
        state
    }
}

fn earth_moon_satellites(body_count: usize) -> BodyState {
    let mut state = BodyState::with_capacity(body_count);
    state.push(Double4::ZERO, Double4::ZERO, EARTH_MASS * G);
    state.push(MOON_POSITION.into(), MOON_VELOCITY.into(), MOON_MASS * G);

    for i in 2..body_count {
        let i_f = i as f64;
        state.push(
            Double4::new(SATELLITE_RADIUS + i_f * 1000.0, 0.0, 0.0),
            Double4::new(0.0, 7800.0 + 3386.0 * (i_f / body_count as f64), 0.0),
            SATELLITE_MASS * G,
        );
    }

    state.positions.truncate(body_count);
    state.velocities.truncate(body_count);
    state.masses.truncate(body_count);
    state
}

fn solar_system() -> BodyState {
    let mut state = BodyState::with_capacity(solar_system::PLANETS.len() + 1);
    state.push(Double4::ZERO, Double4::ZERO, solar_system::SUN_MASS * G);

    for planet in &solar_system::PLANETS {
        log::trace!("adding {}", planet.name);
        state.push(
            planet.position.into(),
            planet.velocity.into(),
            planet.mass * G,
        );
    }

    state
}

fn periodic(orbit: PeriodicOrbit) -> BodyState {
    let data = orbit.data();
    let mut state = BodyState::with_capacity(3);

    for i in 0..3 {
        state.push(
            data.positions[i].into(),
            data.velocities[i].into(),
            data.masses[i],
        );
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earth_moon_satellites_has_requested_count() {
        for n in [0, 1, 2, 3, 100] {
            let state = Scenario::EarthMoonSatellites.bodies(n);
            assert_eq!(state.len(), n);
            assert_eq!(state.positions.len(), n);
            assert_eq!(state.velocities.len(), n);
        }
    }

    #[test]
    fn fixed_size_scenarios_ignore_count() {
        for n in [1, 5, 100] {
            assert_eq!(Scenario::SolarSystem.bodies(n).len(), 10);
            assert_eq!(Scenario::Periodic(PeriodicOrbit::Infinity).bodies(n).len(), 3);
            assert_eq!(Scenario::Periodic(PeriodicOrbit::LiLiaoUe2d).bodies(n).len(), 3);
        }
    }

    #[test]
    fn satellites_fan_out() {
        let state = Scenario::EarthMoonSatellites.bodies(4);

        assert_eq!(state.masses[0], EARTH_MASS * G);
        assert_eq!(state.positions[1], Double4::from(MOON_POSITION));
        assert_eq!(state.positions[2], Double4::new(6_573_000.0, 0.0, 0.0));
        assert_eq!(state.positions[3], Double4::new(6_574_000.0, 0.0, 0.0));
        assert_eq!(state.velocities[2], Double4::new(0.0, 7800.0 + 3386.0 * 0.5, 0.0));
        assert_eq!(state.masses[3], SATELLITE_MASS * G);
    }

    #[test]
    fn selectors() {
        assert_eq!(Scenario::from_selector("solar-system"), Scenario::SolarSystem);
        assert_eq!(
            Scenario::from_selector("Li-Liao-UE2D"),
            Scenario::Periodic(PeriodicOrbit::LiLiaoUe2d)
        );
        assert_eq!(
            Scenario::from_selector("two-body-satellites"),
            Scenario::EarthMoonSatellites
        );
    }

    #[test]
    fn unknown_selector_falls_back_to_earth_moon_satellites() {
        assert_eq!(
            Scenario::from_selector("andromeda"),
            Scenario::EarthMoonSatellites
        );
        assert_eq!(Scenario::from_selector(""), Scenario::EarthMoonSatellites);
    }

    #[test]
    fn pad_lane_is_zero() {
        let state = Scenario::SolarSystem.bodies(0);
        assert!(state
            .positions
            .iter()
            .chain(&state.velocities)
            .all(|v| v.pad() == 0.0));
    }
}
