//! Narrow contract for the spectrum-based numerical backends.
//!
//! The two external solvers (diffusion- and moments-style) are black boxes
//! behind this trait: given a model, resolved parameter values and a grid
//! configuration, they produce an expected spectrum. Likelihood and scaling
//! are computed by the engine, not the solver.

use crate::data::Spectrum;
use crate::engines::GridSizes;
use crate::errors::EngineError;
use crate::model::{Bindings, EpochModel};

/// A spectrum-based numerical backend.
pub trait SfsSolver {
    /// Stable identifier used for registry lookups and error messages.
    fn id(&self) -> &'static str;

    /// Simulate the expected spectrum for `model` at the given parameter
    /// bindings on `sample_sizes`, with the backend-specific grid
    /// configuration.
    fn simulate(
        &mut self,
        model: &EpochModel,
        bindings: &Bindings,
        sample_sizes: &[usize],
        grid: &GridSizes,
    ) -> Result<Spectrum, EngineError>;
}
