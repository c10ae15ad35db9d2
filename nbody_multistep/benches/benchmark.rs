use criterion::{AxisScale, BenchmarkGroup, BenchmarkId, Criterion, PlotConfiguration};

use nbody_multistep::{gravity::G, prelude::*};
use rand::prelude::*;

pub fn random_state(rng: &mut StdRng, count: usize) -> BodyState {
    let mut state = BodyState::with_capacity(count);
    for _ in 0..count {
        let mut vector = || Double4::from([0.0; 3].map(|_: f64| rng.gen_range(-1e7..1e7)));
        let (position, velocity) = (vector(), vector() * 1e-3);
        state.push(position, velocity, rng.gen_range(1e20..1e24) * G);
    }
    state
}

#[inline]
fn bench_sweep<S: AccelerationSweep>(
    state: &BodyState,
    sweep: S,
    group: &mut BenchmarkGroup<'_, criterion::measurement::WallTime>,
) {
    let name = std::any::type_name::<S>().trim_start_matches("nbody_multistep::");
    group.bench_function(BenchmarkId::new(name, state.len()), |bencher| {
        bencher.iter(|| sweep.accelerations(&state.positions, &state.masses))
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sweep");
    group
        .plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic))
        .warm_up_time(std::time::Duration::from_secs(1))
        .measurement_time(std::time::Duration::from_secs(1))
        .sample_size(15);

    for i in (1..12).map(|i| 2usize.pow(i)) {
        let state = random_state(&mut StdRng::seed_from_u64(1808), i);

        bench_sweep(&state, sequential::BruteForce, &mut group);
        #[cfg(feature = "parallel")]
        bench_sweep(&state, parallel::BruteForce, &mut group);
    }
    group.finish();

    let mut group = c.benchmark_group("History");
    group
        .warm_up_time(std::time::Duration::from_secs(1))
        .measurement_time(std::time::Duration::from_secs(5))
        .sample_size(10);

    for count in [8, 64] {
        let state = random_state(&mut StdRng::seed_from_u64(1808), count);

        for scheme in [MultistepScheme::FivePoint, MultistepScheme::FifteenPoint] {
            let id = BenchmarkId::new(format!("{scheme:?}"), count);
            group.bench_function(id, |bencher| {
                bencher.iter(|| MultistepHistory::build(&state, 1.0, scheme, sequential::BruteForce))
            });
        }
    }
    group.finish();
}

criterion::criterion_group!(benches, criterion_benchmark);
criterion::criterion_main!(benches);
