#![warn(missing_docs)]
//! # nbody_multistep
//!
//! Brute-force N-body gravity integrated on a compute device, with high order symmetric multistep
//! methods seeded from a single initial state.
//!
//! ## Goals
//!
//! A multistep method needs the positions and accelerations of several past steps before it can
//! take its first one. This crate reconstructs them by integrating the initial state backwards in
//! time with a fine leapfrog, lays them out in circular history buffers and hands them to a device
//! that steps the system forward, advancing the ring cursor after every step instead of moving the
//! samples.
//!
//! ### Integration methods
//!
//! Five methods are available through [`IntegrationMethod`](kernels::IntegrationMethod):
//! symplectic Euler, leapfrog, classical fourth order Runge-Kutta and two symmetric multistep
//! methods using 5 and 15 position samples. Every method runs as one or more kernels of the
//! [`Kernel`](kernels::Kernel) catalogue.
//!
//! ### Devices
//!
//! Kernels are dispatched through the [`ComputeDevice`](dispatch::ComputeDevice) trait.
//! [`HostDevice`](host::HostDevice) runs them on the calling thread and is always available.
//! Enable the `gpu` feature to run them on the GPU with [wgpu](https://github.com/gfx-rs/wgpu),
//! which requires an adapter supporting 64-bit floats in shaders. The `parallel` feature uses
//! [rayon](https://github.com/rayon-rs/rayon) to seed the multistep history.
//!
//! ## Using nbody_multistep
//!
//! A [`Simulation`](run::Simulation) ties a [`RunConfig`](config::RunConfig), a device and a
//! [`TrajectorySink`](output::TrajectorySink) together.
//!
//! ```
//! use nbody_multistep::prelude::*;
//!
//! let config = RunConfig {
//!     body_count: 10,
//!     iterations: 8,
//!     method: IntegrationMethod::Multistep5,
//!     ..Default::default()
//! };
//!
//! let mut rows = Vec::<TrajectoryRow>::new();
//! let summary = Simulation::new(config, HostDevice::new(), &mut rows)?.run()?;
//!
//! assert_eq!(summary.final_positions.len(), 10);
//! // The initial state and every iteration, relative to the first body.
//! assert_eq!(rows.len(), 9 * 10);
//! # Ok::<(), nbody_multistep::Error>(())
//! ```
//!
//! The history rings can also be built on their own.
//!
//! ```
//! use nbody_multistep::prelude::*;
//!
//! let state = Scenario::EarthMoonSatellites.bodies(4);
//! let history =
//!     MultistepHistory::build(&state, 1.0, MultistepScheme::FivePoint, sequential::BruteForce)?;
//!
//! // Five slots of four bodies, four doubles each.
//! assert_eq!(history.flat_positions().len(), 5 * 4 * 4);
//! // Slot 1 holds the present.
//! assert_eq!(&history.positions()[4..8], state.positions.as_slice());
//! # Ok::<(), nbody_multistep::Error>(())
//! ```

pub mod config;
pub mod dispatch;
/// Error type.
pub mod error;
/// Algorithms that use the GPU.
#[cfg(feature = "gpu")]
pub mod gpu;
/// Newtonian gravity between point masses.
pub mod gravity;
pub mod history;
/// Device that runs every kernel on the host.
pub mod host;
pub mod kernels;
/// Trajectory output.
pub mod output;
/// Algorithms that use multiple CPU threads.
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod run;
/// Initial conditions.
pub mod scenario;
/// Algorithms that use one CPU thread.
pub mod sequential;
/// Double precision vector with the device record layout.
pub mod vector;

pub use error::{Error, Result};

/// Most commonly used types and traits.
pub mod prelude {
    pub use crate::{
        config::RunConfig,
        dispatch::ComputeDevice,
        gravity::AccelerationSweep,
        history::{builder::MultistepHistory, HistoryCursor, HistoryLayout, MultistepScheme},
        host::HostDevice,
        kernels::IntegrationMethod,
        output::{CsvSink, TrajectoryRow, TrajectorySink},
        run::{RunSummary, Simulation},
        scenario::{BodyState, PeriodicOrbit, Scenario},
        sequential,
        vector::Double4,
        Error,
    };

    #[cfg(feature = "gpu")]
    pub use crate::gpu::WgpuDevice;
    #[cfg(feature = "parallel")]
    pub use crate::parallel;
}
