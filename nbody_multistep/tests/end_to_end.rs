use nbody_multistep::{gravity::G, prelude::*};

fn earth_moon() -> BodyState {
    let mut state = BodyState::with_capacity(2);
    state.push(Double4::ZERO, Double4::ZERO, 5.972e24 * G);
    state.push(
        Double4::new(3.84e8, 0.0, 0.0),
        Double4::new(0.0, 1022.0, 0.0),
        7.348e22 * G,
    );
    state
}

// Unit gravitational parameter, unit radius: period `2π`.
fn circular_orbit() -> BodyState {
    let mut state = BodyState::with_capacity(2);
    state.push(Double4::ZERO, Double4::ZERO, 1.0);
    state.push(Double4::new(1.0, 0.0, 0.0), Double4::new(0.0, 1.0, 0.0), 0.0);
    state
}

fn run(config: RunConfig, state: &BodyState) -> RunSummary {
    Simulation::new(config, HostDevice::new(), Vec::<TrajectoryRow>::new())
        .unwrap()
        .run_state(state)
        .unwrap()
}

#[test]
fn symplectic_step_is_deterministic() {
    let config = RunConfig {
        iterations: 1,
        time_step: 1.0,
        method: IntegrationMethod::SymplecticEuler,
        reference_frame: None,
        ..Default::default()
    };
    let state = earth_moon();

    let first = run(config.clone(), &state);
    let second = run(config, &state);

    let bits = |positions: &[Double4]| -> Vec<u64> {
        positions
            .iter()
            .flat_map(|p| p.to_array())
            .map(f64::to_bits)
            .collect()
    };
    assert_eq!(bits(&first.final_positions), bits(&second.final_positions));

    // Kick then drift: the moon falls toward the earth by `a Δt²`.
    let moon = first.final_positions[1];
    let fall = 5.972e24 * G / (3.84e8 * 3.84e8);
    assert!((moon.x() - (3.84e8 - fall)).abs() < 1e-6);
    assert_eq!(moon.y(), 1022.0);
}

#[test]
fn every_method_stays_on_a_circular_orbit() {
    let tolerances = [
        (IntegrationMethod::SymplecticEuler, 2e-2),
        (IntegrationMethod::Leapfrog, 1e-3),
        (IntegrationMethod::Rk4, 1e-6),
        (IntegrationMethod::Multistep5, 1e-6),
        (IntegrationMethod::Multistep15, 1e-6),
    ];

    let (time_step, iterations) = (0.01, 200);
    let time = time_step * iterations as f64;
    let exact = Double4::new(time.cos(), time.sin(), 0.0);

    for (method, tolerance) in tolerances {
        let summary = run(
            RunConfig {
                iterations,
                time_step,
                method,
                reference_frame: None,
                log_every: 50,
                ..Default::default()
            },
            &circular_orbit(),
        );

        assert_eq!(summary.final_positions[0], Double4::ZERO, "{method}");

        let satellite = summary.final_positions[1];
        let radius = satellite.dot3(satellite).sqrt();
        assert!((radius - 1.0).abs() < tolerance, "{method}: radius {radius}");

        if tolerance < 1e-5 {
            let error = satellite - exact;
            assert!(error.dot3(error).sqrt() < 1e-5, "{method}: {satellite:?}");
        }
    }
}

#[test]
fn csv_rows_are_relative_to_the_reference_body() {
    let config = RunConfig {
        body_count: 3,
        iterations: 3,
        time_step: 60.0,
        reference_frame: Some(1),
        ..Default::default()
    };
    let initial = config.scenario().bodies(config.body_count);

    let mut simulation = Simulation::new(config, HostDevice::new(), CsvSink::new(Vec::new())).unwrap();
    let summary = simulation.run().unwrap();
    let bytes = simulation.into_sink().into_inner().unwrap();

    let rows = csv::Reader::from_reader(bytes.as_slice())
        .deserialize()
        .collect::<Result<Vec<TrajectoryRow>, _>>()
        .unwrap();

    assert_eq!(rows.len(), 4 * 3);
    assert!(rows
        .iter()
        .filter(|row| row.body_id == 1)
        .all(|row| [row.x, row.y, row.z] == [0.0; 3]));

    let earth = rows[0];
    assert_eq!((earth.time, earth.body_id), (0.0, 0));
    assert_eq!([earth.x, earth.y, earth.z], (-initial.positions[1]).to_array());

    let last = &rows[9..];
    assert_eq!(last[0].time, 180.0);
    for (row, position) in last.iter().zip(&summary.final_positions) {
        let expected = *position - summary.final_positions[1];
        assert_eq!([row.x, row.y, row.z], expected.to_array());
    }
}
