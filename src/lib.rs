//! Demograph: an engine layer for demographic-history inference from
//! site-frequency spectra.
//!
//! This library provides the pieces an optimizer plugs together: demographic
//! models (epoch-based and tree-based, with translation between them),
//! observed-spectrum loading and transforms, and engines that turn a model
//! plus a parameter point into a log-likelihood. Spectrum-based numerical
//! backends are driven through the [`engines::SfsSolver`] trait; the
//! coalescent simulator is driven as an external process.

pub mod data;
pub mod engines;
pub mod errors;
pub mod model;
pub mod prelude;

// Re-export commonly used types for convenient external access.
//
// These types form the public, stable surface most consumers will use when
// wiring an optimizer to an engine. Re-exporting them here makes them
// available as `demograph::EpochModel`, `demograph::SfsDataHolder`, etc.
pub use data::{read_sfs, SfsDataHolder, Spectrum};
pub use engines::{Engine, EngineRegistry, EngineSettings, GridSizes};
pub use errors::{DataError, EngineError, ModelError};
pub use model::{DemographicModel, EpochModel, TreeModel, Values, Variable, VariablePool};
