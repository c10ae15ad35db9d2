use anyhow::{Context, Result};
use clap::Parser;
use nbody_multistep::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(about = "Runs an N-body scenario and writes the trajectories to CSV")]
struct Args {
    /// YAML run configuration. Missing fields take their default value.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CSV file.
    #[arg(short, long, default_value = "positions.csv")]
    output: PathBuf,

    /// Integration method, overrides the configuration file.
    #[arg(short, long)]
    method: Option<IntegrationMethod>,

    /// Scenario selector, overrides the configuration file.
    #[arg(short, long)]
    scenario: Option<String>,

    /// Number of bodies, overrides the configuration file.
    #[arg(short = 'n', long)]
    bodies: Option<usize>,

    /// Number of iterations, overrides the configuration file.
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Run the kernels on the host even when a GPU is available.
    #[arg(long)]
    host: bool,
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(scenario) = &args.scenario {
        config.scenario.clone_from(scenario);
    }
    if let Some(bodies) = args.bodies {
        config.body_count = bodies;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }

    Ok(config)
}

fn run<D: ComputeDevice>(config: RunConfig, device: D, output: &Path) -> Result<RunSummary> {
    let sink = CsvSink::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let mut simulation = Simulation::new(config, device, sink)?;
    Ok(simulation.run()?)
}

#[cfg(feature = "gpu")]
fn is_kernel_build(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<Error>(), Some(Error::KernelBuild { .. }))
}

#[cfg(feature = "gpu")]
fn run_on_device(config: RunConfig, args: &Args) -> Result<RunSummary> {
    if !args.host {
        match WgpuDevice::new(config.local_size) {
            Ok(device) => {
                let device = device.with_kernel_source(config.kernel_source.clone());
                match run(config.clone(), device, &args.output) {
                    Err(e) if is_kernel_build(&e) => log::warn!("{e}, running on the host instead"),
                    result => return result,
                }
            }
            Err(e) => log::warn!("{e}, running on the host instead"),
        }
    }

    run(config, HostDevice::new(), &args.output)
}

#[cfg(not(feature = "gpu"))]
fn run_on_device(config: RunConfig, args: &Args) -> Result<RunSummary> {
    if config.kernel_source.is_some() && !args.host {
        log::warn!("kernel_source is ignored without the gpu feature");
    }

    run(config, HostDevice::new(), &args.output)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    log::debug!("{config:?}");

    let summary = run_on_device(config, &args)?;
    println!(
        "{} bodies, {} iterations of {} on {}: {:.3?} per run",
        summary.body_count,
        summary.iterations,
        summary.method,
        summary.device,
        summary.mean_run()
    );
    println!("trajectories written to {}", args.output.display());

    Ok(())
}
