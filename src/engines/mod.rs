//! Engine layer: a common evaluation contract over the spectrum-based
//! numerical backends and the external coalescent simulator.

pub mod coalescent;
pub mod solver;
pub mod spectrum;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::model::Values;

pub use coalescent::CoalescentEngine;
pub use solver::SfsSolver;
pub use spectrum::{ll_multinomial, optimal_sfs_scaling, SpectrumEngine};

/// Grid configuration for the spectrum-based backends. Diffusion-style
/// solvers take explicit per-population grid sizes; moments-style solvers
/// take a single extrapolation factor.
#[derive(Debug, Clone, PartialEq)]
pub enum GridSizes {
    Scalar(f64),
    Sizes(Vec<usize>),
}

/// Common contract of all engines: given parameter values for the configured
/// model and data, produce a log-likelihood.
pub trait Engine {
    /// Stable identifier used for registry lookups.
    fn id(&self) -> &'static str;

    /// Log-likelihood of the configured data under the configured model at
    /// `values`.
    fn evaluate(&mut self, values: &Values) -> Result<f64, EngineError>;
}

/// Environment variable naming the coalescent simulator binary.
pub const COALESCENT_PATH_ENV: &str = "FSC2_PATH";

const DEFAULT_N_SIMULATIONS: usize = 1000;
const DEFAULT_N_ECM_LOOPS: usize = 20;

/// Runtime configuration shared by engine construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Path of the coalescent simulator binary, when available.
    pub coalescent_path: Option<PathBuf>,
    /// Coalescent simulations per likelihood approximation.
    pub n_simulations: usize,
    /// Conditional-maximization loops per simulator run.
    pub n_ecm_loops: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            coalescent_path: None,
            n_simulations: DEFAULT_N_SIMULATIONS,
            n_ecm_loops: DEFAULT_N_ECM_LOOPS,
        }
    }
}

impl EngineSettings {
    /// Detect the coalescent simulator from the environment. The path only
    /// counts when it names an existing file.
    pub fn from_env() -> Self {
        let coalescent_path = env::var_os(COALESCENT_PATH_ENV)
            .map(PathBuf::from)
            .filter(|path| path.exists());
        if coalescent_path.is_none() {
            log::debug!(
                "{COALESCENT_PATH_ENV} not set or missing on disk; \
                 coalescent engine unavailable"
            );
        }
        Self {
            coalescent_path,
            ..Self::default()
        }
    }
}

/// Engine identifiers known at startup. The spectrum-based backends are
/// always listed; the coalescent engine appears only when its binary is
/// configured.
#[derive(Debug, Clone)]
pub struct EngineRegistry {
    ids: Vec<&'static str>,
}

impl EngineRegistry {
    pub fn new(settings: &EngineSettings) -> Self {
        let mut ids = vec!["dadi", "moments"];
        if settings.coalescent_path.is_some() {
            ids.push("fastsimcoal2");
        }
        Self { ids }
    }

    pub fn is_available(&self, id: &str) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[&'static str] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_without_coalescent_path() {
        let registry = EngineRegistry::new(&EngineSettings::default());
        assert_eq!(registry.ids(), ["dadi", "moments"]);
        assert!(registry.is_available("dadi"));
        assert!(registry.is_available("moments"));
        assert!(!registry.is_available("fastsimcoal2"));
    }

    #[test]
    fn test_registry_with_coalescent_path() {
        let settings = EngineSettings {
            coalescent_path: Some(PathBuf::from("/opt/fsc27")),
            ..EngineSettings::default()
        };
        let registry = EngineRegistry::new(&settings);
        assert!(registry.is_available("fastsimcoal2"));
        assert_eq!(registry.ids().len(), 3);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.n_simulations, 1000);
        assert_eq!(settings.n_ecm_loops, 20);
        assert!(settings.coalescent_path.is_none());
    }
}
