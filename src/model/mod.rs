//! Demographic-model representations and parameter handling.
//!
//! Two structurally equivalent model families live here: the epoch-based
//! [`EpochModel`] (time intervals with sizes, migrations and trajectory
//! markers) and the tree-based [`TreeModel`] (generative events ordered for
//! coalescent simulation). [`EpochModel::to_tree`] converts between them.

pub mod epoch;
pub mod expression;
pub mod pool;
pub mod translate;
pub mod tree;
pub mod variables;

pub use epoch::{DynamicArg, Epoch, EpochEvent, EpochModel, Split};
pub use expression::Expr;
pub use pool::VariablePool;
pub use translate::{find_matching_event, growth_formula, growth_rate};
pub use tree::{
    DemographicModel, Growth, Leaf, LineageMovement, PopulationSizeChange, TreeEvent, TreeModel,
};
pub use variables::{
    numeric_bindings, resolve_values, Bindings, Dynamics, ParamValue, Values, Variable,
    VariableKind,
};
