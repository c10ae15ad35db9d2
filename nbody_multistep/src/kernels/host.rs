use crate::{
    error::Result,
    gravity::total_acceleration,
    history::{HistoryCursor, HistoryLayout, MultistepScheme},
    kernels::{RK4_STAGE_TIMES, RK4_WEIGHTS},
    vector::Double4,
};

/// Kick-then-drift step shared by symplectic Euler and leapfrog.
///
/// With velocities staggered half a step behind the positions, the same update is a leapfrog
/// step.
pub fn integrate_single_step(
    positions_in: &[Double4],
    velocities_in: &[Double4],
    positions_out: &mut [Double4],
    velocities_out: &mut [Double4],
    masses: &[f64],
    dt: f64,
    body_count: usize,
) -> Result<()> {
    let positions = &positions_in[..body_count];
    let masses = &masses[..body_count];

    for id in 0..body_count {
        let acceleration = total_acceleration(positions, masses, id)?;
        let velocity = velocities_in[id] + dt * acceleration;

        velocities_out[id] = velocity;
        positions_out[id] = positions[id] + dt * velocity;
    }

    Ok(())
}

/// Evaluates derivative `stage` of a Runge-Kutta step into region `stage` of `kx` and `kv`.
///
/// Stage `s > 0` reads region `s - 1`, so the stages must run in order.
#[allow(clippy::too_many_arguments)]
pub fn rk4_stage(
    positions_in: &[Double4],
    velocities_in: &[Double4],
    kx: &mut [Double4],
    kv: &mut [Double4],
    masses: &[f64],
    dt: f64,
    body_count: usize,
    stage: usize,
) -> Result<()> {
    let n = body_count;
    let h = RK4_STAGE_TIMES[stage] * dt;
    let masses = &masses[..n];

    let (previous_kx, current_kx) = kx.split_at_mut(stage * n);
    let (previous_kv, current_kv) = kv.split_at_mut(stage * n);

    let (positions, velocities): (Vec<_>, Vec<_>) = if stage == 0 {
        (positions_in[..n].to_vec(), velocities_in[..n].to_vec())
    } else {
        let dx = &previous_kx[(stage - 1) * n..];
        let dv = &previous_kv[(stage - 1) * n..];
        (0..n)
            .map(|i| (positions_in[i] + h * dx[i], velocities_in[i] + h * dv[i]))
            .unzip()
    };

    for id in 0..n {
        current_kx[id] = velocities[id];
        current_kv[id] = total_acceleration(&positions, masses, id)?;
    }

    Ok(())
}

/// Combines the four Runge-Kutta stages into the next state.
#[allow(clippy::too_many_arguments)]
pub fn rk4_combine(
    positions_in: &[Double4],
    velocities_in: &[Double4],
    kx: &[Double4],
    kv: &[Double4],
    positions_out: &mut [Double4],
    velocities_out: &mut [Double4],
    dt: f64,
    body_count: usize,
) {
    let n = body_count;

    for id in 0..n {
        let (mut dx, mut dv) = (Double4::ZERO, Double4::ZERO);
        for (stage, weight) in RK4_WEIGHTS.iter().enumerate() {
            dx += *weight * kx[stage * n + id];
            dv += *weight * kv[stage * n + id];
        }

        positions_out[id] = positions_in[id] + (dt / 6.0) * dx;
        velocities_out[id] = velocities_in[id] + (dt / 6.0) * dv;
    }
}

/// Advances a multistep history by one step, writing logical position slot 0.
///
/// The acceleration at the present positions is stored in logical acceleration slot 0 before it
/// is used. The cursor is left untouched, see [`shift_history`].
pub fn integrate_multistep(
    scheme: MultistepScheme,
    positions: &mut [Double4],
    accelerations: &mut [Double4],
    masses: &[f64],
    cursor: HistoryCursor,
    dt: f64,
    body_count: usize,
) -> Result<()> {
    let layout = HistoryLayout::new(scheme, body_count);
    let (h, a) = (layout.position_slots(), layout.acceleration_slots());
    let coefficients = scheme.coefficients();
    let position_slot = |slot| cursor.physical_position_slot(slot, h);
    let acceleration_slot = |slot| cursor.physical_acceleration_slot(slot, a);

    let present = layout.index(position_slot(1), 0);
    let now = layout.index(acceleration_slot(0), 0);
    for id in 0..body_count {
        accelerations[now + id] = total_acceleration(
            &positions[present..present + body_count],
            &masses[..body_count],
            id,
        )?;
    }

    let future = layout.index(position_slot(0), 0);
    for id in 0..body_count {
        let mut x = Double4::ZERO;
        for (j, c) in coefficients.position.iter().enumerate() {
            x += *c * positions[layout.index(position_slot(j + 1), id)];
        }

        let mut acceleration = Double4::ZERO;
        for (j, b) in coefficients.acceleration.iter().enumerate() {
            acceleration += *b * accelerations[layout.index(acceleration_slot(j), id)];
        }

        positions[future + id] = x + (dt * dt) * acceleration;
    }

    Ok(())
}

/// Body of the `shift_history` kernel.
#[inline]
pub fn shift_history(cursor: &mut HistoryCursor, position_slots: u32, acceleration_slots: u32) {
    cursor.shift(position_slots, acceleration_slots);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{history::builder::MultistepHistory, scenario::BodyState, sequential::BruteForce};

    fn circular() -> BodyState {
        let mut state = BodyState::default();
        state.push(Double4::ZERO, Double4::ZERO, 1.0);
        state.push(Double4::new(1.0, 0.0, 0.0), Double4::new(0.0, 1.0, 0.0), 0.0);
        state
    }

    #[test]
    fn single_step_kicks_then_drifts() {
        let state = circular();
        let mut positions = vec![Double4::ZERO; 2];
        let mut velocities = vec![Double4::ZERO; 2];

        integrate_single_step(
            &state.positions,
            &state.velocities,
            &mut positions,
            &mut velocities,
            &state.masses,
            0.5,
            2,
        )
        .unwrap();

        assert_eq!(velocities[1], Double4::new(-0.5, 1.0, 0.0));
        assert_eq!(positions[1], Double4::new(0.75, 0.5, 0.0));
        assert_eq!(positions[0], Double4::ZERO);
    }

    #[test]
    fn rk4_matches_taylor_expansion() {
        let state = circular();
        let dt = 0.01;
        let mut kx = vec![Double4::ZERO; 8];
        let mut kv = vec![Double4::ZERO; 8];
        let mut positions = vec![Double4::ZERO; 2];
        let mut velocities = vec![Double4::ZERO; 2];

        for stage in 0..4 {
            rk4_stage(
                &state.positions,
                &state.velocities,
                &mut kx,
                &mut kv,
                &state.masses,
                dt,
                2,
                stage,
            )
            .unwrap();
        }
        rk4_combine(
            &state.positions,
            &state.velocities,
            &kx,
            &kv,
            &mut positions,
            &mut velocities,
            dt,
            2,
        );

        let expected = Double4::new(dt.cos(), dt.sin(), 0.0);
        let diff = positions[1] - expected;
        assert!(diff.dot3(diff).sqrt() < 1e-10);
    }

    #[test]
    fn multistep_predicts_next_position() {
        let state = circular();
        let dt = 0.05;
        let scheme = MultistepScheme::FivePoint;
        let history = MultistepHistory::build(&state, dt, scheme, BruteForce).unwrap();

        let mut positions = history.positions().to_vec();
        let mut accelerations = history.accelerations().to_vec();
        integrate_multistep(
            scheme,
            &mut positions,
            &mut accelerations,
            history.masses(),
            HistoryCursor::IDENTITY,
            dt,
            2,
        )
        .unwrap();

        // The present acceleration lands in slot 0.
        assert_eq!(accelerations[1], Double4::new(-1.0, 0.0, 0.0));

        let expected = Double4::new(dt.cos(), dt.sin(), 0.0);
        let diff = positions[1] - expected;
        assert!(diff.dot3(diff).sqrt() < 1e-7, "{:?}", positions[1]);
    }
}
