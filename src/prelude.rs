//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use demograph::prelude::*;
//!
//! let holder = SfsDataHolder::new("data/YRI_CEU.fs").with_outgroup(true);
//! let settings = EngineSettings::default();
//! let registry = EngineRegistry::new(&settings);
//! assert!(registry.is_available("dadi"));
//! ```

pub use crate::data::{read_sfs, SfsDataHolder, Spectrum};
pub use crate::engines::{
    CoalescentEngine, Engine, EngineRegistry, EngineSettings, GridSizes, SfsSolver,
    SpectrumEngine,
};
pub use crate::errors::{DataError, EngineError, ModelError};
pub use crate::model::{
    DemographicModel, Dynamics, Epoch, EpochEvent, EpochModel, Expr, ParamValue, Split,
    TreeEvent, TreeModel, Values, Variable, VariableKind, VariablePool,
};
