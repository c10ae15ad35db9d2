/// A body of the solar system: name, mass in kilograms, heliocentric position in meters and
/// velocity in meters per second.
pub(super) struct Planet {
    pub name: &'static str,
    pub mass: f64,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

pub(super) const SUN_MASS: f64 = 1.98847e30;

pub(super) const PLANETS: [Planet; 9] = [
    Planet {
        name: "Mercury",
        mass: 3.30110e23,
        position: [-1.778531837e10, -5.503580014e10, -2.863506198e9],
        velocity: [4.534993837e4, -1.437756383e4, -5.336940544e3],
    },
    Planet {
        name: "Venus",
        mass: 4.86750e24,
        position: [-1.079660725e11, -3.780889628e9, 6.180934708e9],
        velocity: [1.194223826e3, -3.499657845e4, -5.472545017e2],
    },
    Planet {
        name: "Earth",
        mass: 5.97220e24,
        position: [-2.715937693e10, 1.471119843e11, 0.0],
        velocity: [-2.929018774e4, -5.407467331e3, 0.0],
    },
    Planet {
        name: "Mars",
        mass: 6.41710e23,
        position: [2.271475243e11, -1.801975848e10, -5.961488745e9],
        velocity: [1.919804156e3, 2.404895549e4, 4.566629865e2],
    },
    Planet {
        name: "Jupiter",
        mass: 1.89820e27,
        position: [6.422253271e11, 4.398313489e11, -1.618127698e10],
        velocity: [-7.374941683e3, 1.077304688e4, 1.204729535e2],
    },
    Planet {
        name: "Saturn",
        mass: 5.68340e26,
        position: [9.215018558e11, 1.096701843e12, -5.573556390e10],
        velocity: [-7.360614440e3, 6.194127637e3, 1.846456958e2],
    },
    Planet {
        name: "Uranus",
        mass: 8.68100e25,
        position: [1.968975639e12, -2.094715223e12, -3.332341864e10],
        velocity: [4.950055308e3, 4.653664282e3, -4.690694500e1],
    },
    Planet {
        name: "Neptune",
        mass: 1.02413e26,
        position: [2.576072063e12, -3.695012804e12, 1.671452050e10],
        velocity: [4.451001596e3, 3.102375941e3, -1.664445004e2],
    },
    Planet {
        name: "Pluto",
        mass: 1.30300e22,
        position: [-2.856021866e12, -4.987977720e12, 1.359798357e12],
        velocity: [3.936929588e3, -2.491965262e3, -8.721221152e2],
    },
];
