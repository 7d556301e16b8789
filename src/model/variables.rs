//! Model parameters: named, bounded variables and their values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::model::VariablePool;

/// Role of a variable within a demographic model.
///
/// All kinds except `Dynamic` are continuous numeric estimation targets.
/// `Dynamic` variables are discrete: their values are [`Dynamics`] markers
/// selecting a size-trajectory shape, and they are excluded from numeric
/// estimation and from the simulator's parameter files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    PopulationSize,
    Time,
    Migration,
    Dynamic,
}

/// Shape of a population-size trajectory over an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dynamics {
    /// Sudden (constant) size.
    Constant,
    /// Exponential growth or decline.
    Exponential,
    /// Linear change.
    Linear,
}

impl Dynamics {
    pub fn is_constant(&self) -> bool {
        matches!(self, Dynamics::Constant)
    }
}

/// A named, bounded model parameter. Identity is the name: no two variables
/// of one model may share it (enforced by [`VariablePool`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    /// Inclusive `[min, max]` domain. Ignored for dynamic variables.
    domain: (f64, f64),
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind, domain: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            kind,
            domain,
        }
    }

    /// Shorthand for a dynamic (trajectory-marker) variable.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Dynamic, (0.0, 0.0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == VariableKind::Dynamic
    }
}

/// A concrete value bound to a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Num(f64),
    Dynamic(Dynamics),
}

impl ParamValue {
    /// Numeric value, or an error naming the variable when the binding is a
    /// dynamic marker.
    pub fn as_num(&self, name: &str) -> Result<f64, ModelError> {
        match self {
            ParamValue::Num(x) => Ok(*x),
            ParamValue::Dynamic(_) => Err(ModelError::ValueTypeMismatch {
                name: name.to_string(),
                expected: "numeric",
            }),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Num(x)
    }
}

impl From<Dynamics> for ParamValue {
    fn from(d: Dynamics) -> Self {
        ParamValue::Dynamic(d)
    }
}

/// Parameter values as supplied by an optimizer: either a vector in pool
/// order or a mapping by variable name. Both shapes resolve to the same
/// pool-ordered bindings, so downstream cache keys do not depend on which
/// shape the caller used.
#[derive(Debug, Clone)]
pub enum Values {
    Vector(Vec<ParamValue>),
    Map(HashMap<String, ParamValue>),
}

impl Values {
    /// Convenience constructor for an all-numeric vector.
    pub fn from_nums(nums: &[f64]) -> Self {
        Values::Vector(nums.iter().map(|&x| ParamValue::Num(x)).collect())
    }
}

/// Pool-ordered `(variable, value)` bindings produced by resolution.
pub type Bindings = Vec<(Variable, ParamValue)>;

/// Resolve `values` against `pool`, producing bindings in pool order.
pub fn resolve_values(pool: &VariablePool, values: &Values) -> Result<Bindings, ModelError> {
    match values {
        Values::Vector(vec) => {
            if vec.len() != pool.len() {
                return Err(ModelError::ValueCountMismatch {
                    expected: pool.len(),
                    got: vec.len(),
                });
            }
            Ok(pool.iter().cloned().zip(vec.iter().copied()).collect())
        }
        Values::Map(map) => pool
            .iter()
            .map(|var| {
                let value = map
                    .get(var.name())
                    .copied()
                    .ok_or_else(|| ModelError::UnknownVariable(var.name().to_string()))?;
                Ok((var.clone(), value))
            })
            .collect(),
    }
}

/// Numeric bindings only (dynamic variables skipped), keyed by name.
pub fn numeric_bindings(bindings: &Bindings) -> HashMap<String, f64> {
    bindings
        .iter()
        .filter_map(|(var, value)| match value {
            ParamValue::Num(x) => Some((var.name().to_string(), *x)),
            ParamValue::Dynamic(_) => None,
        })
        .collect()
}
