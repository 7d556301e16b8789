//! Epoch-based demographic model: an ordered sequence of epochs and splits.

use std::collections::HashMap;

use crate::errors::ModelError;
use crate::model::{
    resolve_values, Bindings, Dynamics, Expr, ParamValue, Values, VariablePool,
};

/// Per-population trajectory marker within an epoch: either fixed or taken
/// from a dynamic variable's bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicArg {
    Fixed(Dynamics),
    Var(String),
}

impl DynamicArg {
    /// Name of the underlying dynamic variable, when there is one.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            DynamicArg::Fixed(_) => None,
            DynamicArg::Var(name) => Some(name),
        }
    }

    /// Resolve to a concrete marker against value bindings.
    pub fn resolve(&self, bindings: &Bindings) -> Result<Dynamics, ModelError> {
        match self {
            DynamicArg::Fixed(dynamics) => Ok(*dynamics),
            DynamicArg::Var(name) => {
                let (_, value) = bindings
                    .iter()
                    .find(|(var, _)| var.name() == name)
                    .ok_or_else(|| ModelError::UnknownVariable(name.clone()))?;
                match value {
                    ParamValue::Dynamic(dynamics) => Ok(*dynamics),
                    ParamValue::Num(_) => Err(ModelError::ValueTypeMismatch {
                        name: name.clone(),
                        expected: "dynamic",
                    }),
                }
            }
        }
    }
}

/// A time interval with per-population sizes, trajectory markers and an
/// optional migration-rate matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    /// Duration of the interval.
    pub time: Expr,
    /// Population sizes at the (older) start of the interval.
    pub init_sizes: Vec<Expr>,
    /// Population sizes at the (more recent) end of the interval.
    pub final_sizes: Vec<Expr>,
    /// Per-pair migration rates, row = source, column = destination.
    pub migration: Option<Vec<Vec<Expr>>>,
    /// Per-population trajectory markers, one per population.
    pub dynamics: Vec<DynamicArg>,
}

/// One population dividing into two. The new population receives the next
/// free index.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Index of the population that divides.
    pub pop_to_div: usize,
    /// Sizes of the two resulting populations, `[pop_to_div, new]`.
    pub sizes: Vec<Expr>,
}

/// Event of an epoch-based model.
#[derive(Debug, Clone, PartialEq)]
pub enum EpochEvent {
    Epoch(Epoch),
    Split(Split),
}

impl EpochEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EpochEvent::Epoch(_) => "Epoch",
            EpochEvent::Split(_) => "Split",
        }
    }
}

/// Epoch-based demographic model: a single ancestral population followed by
/// an ordered sequence of epochs and splits, oldest first.
#[derive(Debug, Clone, Default)]
pub struct EpochModel {
    pub events: Vec<EpochEvent>,
    /// Free parameters of the model.
    pub variables: VariablePool,
    /// Ancestral population size (variable reference or literal).
    pub nanc_size: Option<Expr>,
    /// Per-site per-generation mutation rate, for unit conversion.
    pub mutation_rate: Option<f64>,
    /// Explicit theta0 overriding the mutation-rate derivation.
    pub theta0: Option<f64>,
}

impl EpochModel {
    /// Resolve parameter values (vector or mapping) into pool-ordered
    /// bindings.
    pub fn var2value(&self, values: &Values) -> Result<Bindings, ModelError> {
        resolve_values(&self.variables, values)
    }

    /// Numeric bindings by name, dynamic variables skipped.
    pub fn numeric_values(&self, values: &Values) -> Result<HashMap<String, f64>, ModelError> {
        Ok(crate::model::numeric_bindings(&self.var2value(values)?))
    }

    /// Number of present-day populations implied by the final epoch.
    pub fn number_of_populations(&self) -> usize {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                EpochEvent::Epoch(epoch) => Some(epoch.final_sizes.len()),
                EpochEvent::Split(_) => None,
            })
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Variable, VariableKind};

    #[test]
    fn test_number_of_populations() {
        let model = EpochModel {
            events: vec![
                EpochEvent::Split(Split {
                    pop_to_div: 0,
                    sizes: vec![Expr::var("N1"), Expr::var("N2")],
                }),
                EpochEvent::Epoch(Epoch {
                    time: Expr::var("T1"),
                    init_sizes: vec![Expr::var("N1"), Expr::var("N2")],
                    final_sizes: vec![Expr::var("N1"), Expr::var("N2")],
                    migration: None,
                    dynamics: vec![
                        DynamicArg::Fixed(Dynamics::Constant),
                        DynamicArg::Fixed(Dynamics::Constant),
                    ],
                }),
            ],
            ..Default::default()
        };
        assert_eq!(model.number_of_populations(), 2);
    }

    #[test]
    fn test_dynamic_arg_resolution() {
        let mut pool = VariablePool::new();
        pool.push(Variable::dynamic("dyn1")).unwrap();
        pool.push(Variable::new("N1", VariableKind::PopulationSize, (1.0, 10.0)))
            .unwrap();
        let model = EpochModel {
            variables: pool,
            ..Default::default()
        };
        let bindings = model
            .var2value(&Values::Vector(vec![
                ParamValue::Dynamic(Dynamics::Exponential),
                ParamValue::Num(5.0),
            ]))
            .unwrap();

        let arg = DynamicArg::Var("dyn1".to_string());
        assert_eq!(arg.resolve(&bindings).unwrap(), Dynamics::Exponential);

        let err = DynamicArg::Var("N1".to_string()).resolve(&bindings).unwrap_err();
        assert!(matches!(err, ModelError::ValueTypeMismatch { .. }));
    }
}
