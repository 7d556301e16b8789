//! Tree-based demographic model: generative events ordered for backward-in-
//! time coalescent simulation.

use std::collections::HashMap;

use crate::errors::ModelError;
use crate::model::{resolve_values, Bindings, Dynamics, Expr, Values, VariablePool};

/// Growth rate attached to a leaf or size-change event.
///
/// Formulas stay symbolic: the simulator's configuration wants them as
/// expressions over named parameters, so the translation layer never
/// evaluates them eagerly.
#[derive(Debug, Clone, PartialEq)]
pub enum Growth {
    /// Constant size, rate zero.
    Zero,
    /// Exponential rate `log(Nt/N0)/t` kept as a formula. `dyn_name` is the
    /// dynamic variable the formula is registered under.
    Formula { dyn_name: String, expr: Expr },
}

/// Creation of a present-day population with its initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub pop: usize,
    /// Present-day effective size.
    pub size: Expr,
    pub dynamics: Dynamics,
    pub growth: Growth,
}

/// Merge of lineages backward in time (the counterpart of a forward split).
/// `pop_from` is the population whose division produced the moving lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageMovement {
    /// Sink population receiving the lineage.
    pub pop: usize,
    /// Population the movement is keyed on (the divided population).
    pub pop_from: usize,
    /// Backward time from the present, possibly a sum of time variables.
    pub time: Expr,
    /// Size of the sink after the merge.
    pub size: Expr,
}

/// Instantaneous or continuous size change of one population.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSizeChange {
    pub pop: usize,
    /// Backward time from the present, possibly a sum of time variables.
    pub time: Expr,
    /// New size at that time.
    pub size: Expr,
    pub growth: Growth,
}

/// Event of a tree-based model.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Leaf(Leaf),
    LineageMovement(LineageMovement),
    PopulationSizeChange(PopulationSizeChange),
}

impl TreeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TreeEvent::Leaf(_) => "Leaf",
            TreeEvent::LineageMovement(_) => "LineageMovement",
            TreeEvent::PopulationSizeChange(_) => "PopulationSizeChange",
        }
    }

    /// Backward time of the event; leaves sit at the present.
    pub fn time(&self) -> Option<&Expr> {
        match self {
            TreeEvent::Leaf(_) => None,
            TreeEvent::LineageMovement(movement) => Some(&movement.time),
            TreeEvent::PopulationSizeChange(change) => Some(&change.time),
        }
    }
}

/// Tree-based demographic model. Structurally equivalent information to
/// [`EpochModel`](crate::model::EpochModel) but ordered for generative
/// simulation.
#[derive(Debug, Clone, Default)]
pub struct TreeModel {
    pub events: Vec<TreeEvent>,
    pub variables: VariablePool,
    pub nanc_size: Option<Expr>,
    pub mutation_rate: Option<f64>,
    pub theta0: Option<f64>,
}

impl TreeModel {
    pub fn var2value(&self, values: &Values) -> Result<Bindings, ModelError> {
        resolve_values(&self.variables, values)
    }

    pub fn numeric_values(&self, values: &Values) -> Result<HashMap<String, f64>, ModelError> {
        Ok(crate::model::numeric_bindings(&self.var2value(values)?))
    }

    /// Leaves ordered by population index.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves: Vec<&Leaf> = self
            .events
            .iter()
            .filter_map(|event| match event {
                TreeEvent::Leaf(leaf) => Some(leaf),
                _ => None,
            })
            .collect();
        leaves.sort_by_key(|leaf| leaf.pop);
        leaves
    }

    /// Non-leaf events in model order.
    pub fn non_leaf_events(&self) -> impl Iterator<Item = &TreeEvent> {
        self.events
            .iter()
            .filter(|event| !matches!(event, TreeEvent::Leaf(_)))
    }
}

/// The canonical event-based model in either representation. Engines accept
/// this wrapper and translate per backend.
#[derive(Debug, Clone)]
pub enum DemographicModel {
    Epoch(crate::model::EpochModel),
    Tree(TreeModel),
}

impl DemographicModel {
    pub fn variables(&self) -> &VariablePool {
        match self {
            DemographicModel::Epoch(model) => &model.variables,
            DemographicModel::Tree(model) => &model.variables,
        }
    }

    pub fn var2value(&self, values: &Values) -> Result<Bindings, ModelError> {
        resolve_values(self.variables(), values)
    }

    pub fn mutation_rate(&self) -> Option<f64> {
        match self {
            DemographicModel::Epoch(model) => model.mutation_rate,
            DemographicModel::Tree(model) => model.mutation_rate,
        }
    }

    pub fn theta0(&self) -> Option<f64> {
        match self {
            DemographicModel::Epoch(model) => model.theta0,
            DemographicModel::Tree(model) => model.theta0,
        }
    }
}
