//! Run configuration, loadable from YAML.
//!
//! Every field is optional in the file and falls back to its default:
//!
//! ```yaml
//! body_count: 100
//! iterations: 3000
//! time_step: 1.0
//! local_size: 64
//! method: symplectic-euler # leapfrog, rk4, multistep5 or multistep15
//! scenario: earth-moon-satellites
//! log_every: 1
//! repeat: 1
//! reference_frame: 0       # ~ to log absolute positions
//! kernel_source: ~         # directory of WGSL overrides, gpu only
//! ```

use crate::{
    error::{Error, Result},
    kernels::IntegrationMethod,
    scenario::Scenario,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters of one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Requested number of bodies. Fixed-size scenarios ignore it.
    pub body_count: usize,
    /// Number of macro steps.
    pub iterations: usize,
    /// Macro step `Δt`.
    pub time_step: f64,
    /// Work-group size of the kernel launches.
    pub local_size: u32,
    /// Integration method.
    pub method: IntegrationMethod,
    /// Scenario selector, see [`Scenario::from_selector`].
    pub scenario: String,
    /// Log positions every `log_every` iterations.
    pub log_every: usize,
    /// Number of times the whole run is repeated for timing.
    pub repeat: usize,
    /// Body whose position is subtracted from every logged position.
    pub reference_frame: Option<usize>,
    /// Directory of kernel source overrides.
    pub kernel_source: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            body_count: 100,
            iterations: 3000,
            time_step: 1.0,
            local_size: 64,
            method: IntegrationMethod::default(),
            scenario: "earth-moon-satellites".to_owned(),
            log_every: 1,
            repeat: 1,
            reference_frame: Some(0),
            kernel_source: None,
        }
    }
}

impl RunConfig {
    /// Parses a configuration from YAML text.
    #[inline]
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading configuration from {}", path.display());
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Resolved scenario.
    #[inline]
    pub fn scenario(&self) -> Scenario {
        Scenario::from_selector(&self.scenario)
    }

    /// Rejects values the run loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(Error::Config(format!(
                "time step must be positive and finite, got {}",
                self.time_step
            )));
        }

        let positive = [
            ("log_every", self.log_every),
            ("local_size", self.local_size as usize),
            ("repeat", self.repeat),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("{name} must be positive")));
        }

        Ok(())
    }
}
