//! Translation between the epoch-based and tree-based model representations.
//!
//! The conversion is structural: a `Split` becomes a `LineageMovement`, an
//! epoch boundary with a size or trajectory change becomes a
//! `PopulationSizeChange`, and event times become backward-in-time sums of
//! the epoch durations. Growth rates stay symbolic so the simulator's
//! configuration can express them as formulas over named parameters.
//!
//! Matching in the other direction is approximate: a model whose only
//! difference between two adjacent epochs is a migration-matrix change has
//! no representable tree event, and that change is not recoverable here.

use crate::errors::ModelError;
use crate::model::{
    Dynamics, Epoch, EpochEvent, EpochModel, Expr, Growth, Leaf, LineageMovement,
    PopulationSizeChange, Split, TreeEvent, TreeModel, Values,
};

/// Exponential growth rate from sizes straddling a time interval:
/// with `Nt = N0 * e^(r*t)`, the rate is `r = ln(Nt/N0) / t`.
pub fn growth_rate(n0: f64, nt: f64, t: f64) -> f64 {
    (nt / n0).ln() / t
}

/// Symbolic counterpart of [`growth_rate`]. The simulator consumes rates
/// backward in time, so `nt` is the size at the older end of the interval.
pub fn growth_formula(nt: Expr, n0: Expr, time: Expr) -> Expr {
    Expr::div(Expr::ln(Expr::div(nt, n0)), time)
}

fn growth_for(epoch: &Epoch, pop: usize, bindings: &crate::model::Bindings) -> Result<(Dynamics, Growth), ModelError> {
    let arg = &epoch.dynamics[pop];
    let dynamics = arg.resolve(bindings)?;
    let growth = match dynamics {
        Dynamics::Constant => Growth::Zero,
        Dynamics::Linear => return Err(ModelError::UnsupportedDynamic { pop }),
        Dynamics::Exponential => {
            let dyn_name = arg
                .var_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("dyn{pop}"));
            Growth::Formula {
                dyn_name,
                expr: growth_formula(
                    epoch.init_sizes[pop].clone(),
                    epoch.final_sizes[pop].clone(),
                    epoch.time.clone(),
                ),
            }
        }
    };
    Ok((dynamics, growth))
}

impl EpochModel {
    /// Lossless structural conversion to the tree-based representation.
    ///
    /// Returns a new model; the receiver is untouched. The parameter values
    /// pass through unchanged since both representations share the variable
    /// pool.
    pub fn to_tree(&self, values: &Values) -> Result<(TreeModel, Values), ModelError> {
        let bindings = self.var2value(values)?;

        let last_epoch = self
            .events
            .iter()
            .rev()
            .find_map(|event| match event {
                EpochEvent::Epoch(epoch) => Some(epoch),
                EpochEvent::Split(_) => None,
            })
            .ok_or(ModelError::EmptyModel)?;
        let n_pops = last_epoch.final_sizes.len();

        let mut events = Vec::new();
        for pop in 0..n_pops {
            let (dynamics, growth) = growth_for(last_epoch, pop, &bindings)?;
            events.push(TreeEvent::Leaf(Leaf {
                pop,
                size: last_epoch.final_sizes[pop].clone(),
                dynamics,
                growth,
            }));
        }

        // Walk the events newest-first, accumulating the backward time from
        // the present. The accumulated sum always ends with the current
        // epoch's own time variable, which is what event matching keys on.
        let mut cumulative: Option<Expr> = None;
        let mut next_new_pop = n_pops;
        for (index, event) in self.events.iter().enumerate().rev() {
            match event {
                EpochEvent::Epoch(epoch) => {
                    let boundary = match cumulative.take() {
                        None => epoch.time.clone(),
                        Some(sum) => Expr::add(sum, epoch.time.clone()),
                    };
                    for pop in 0..epoch.init_sizes.len() {
                        let (dynamics, growth) = growth_for(epoch, pop, &bindings)?;
                        if dynamics.is_constant() && epoch.init_sizes[pop] == epoch.final_sizes[pop]
                        {
                            continue;
                        }
                        events.push(TreeEvent::PopulationSizeChange(PopulationSizeChange {
                            pop,
                            time: boundary.clone(),
                            size: epoch.init_sizes[pop].clone(),
                            growth,
                        }));
                    }
                    cumulative = Some(boundary);
                }
                EpochEvent::Split(split) => {
                    next_new_pop -= 1;
                    let time = cumulative.clone().unwrap_or(Expr::Value(0.0));
                    let size = self
                        .size_before_split(index, split.pop_to_div)
                        .unwrap_or_else(|| split.sizes[0].clone());
                    events.push(TreeEvent::LineageMovement(LineageMovement {
                        pop: next_new_pop,
                        pop_from: split.pop_to_div,
                        time,
                        size,
                    }));
                }
            }
        }

        let tree = TreeModel {
            events,
            variables: self.variables.clone(),
            nanc_size: self.nanc_size.clone(),
            mutation_rate: self.mutation_rate,
            theta0: self.theta0,
        };
        Ok((tree, values.clone()))
    }

    /// Size of `pop` just before the split at `split_index`: the final size
    /// in the nearest older epoch, or the ancestral size.
    fn size_before_split(&self, split_index: usize, pop: usize) -> Option<Expr> {
        self.events[..split_index]
            .iter()
            .rev()
            .find_map(|event| match event {
                EpochEvent::Epoch(epoch) => epoch.final_sizes.get(pop).cloned(),
                EpochEvent::Split(_) => None,
            })
            .or_else(|| self.nanc_size.clone())
    }
}

fn last_time_var(expr: &Expr) -> Option<&str> {
    expr.variables().last().copied()
}

/// Backward time variable of the first epoch after `split`, used to line a
/// `LineageMovement` up with its `Split` counterpart.
fn next_epoch_time_var<'a>(events: &'a [EpochEvent], split: &Split) -> Option<&'a str> {
    let index = events.iter().position(|event| match event {
        EpochEvent::Split(other) => std::ptr::eq(other, split),
        EpochEvent::Epoch(_) => false,
    })?;
    events[index + 1..].iter().find_map(|event| match event {
        EpochEvent::Epoch(epoch) => last_time_var(&epoch.time),
        EpochEvent::Split(_) => None,
    })
}

/// Recover the epoch-model counterpart of a tree event.
///
/// The match is approximate and partial: it compares event timing (the last
/// variable of the backward-time sum) and, for movements, direction. Leaves
/// have no counterpart, and neither does an epoch whose only change is a
/// migration-matrix switch.
pub fn find_matching_event<'a>(
    tree_event: &TreeEvent,
    epoch_events: &'a [EpochEvent],
) -> Option<&'a EpochEvent> {
    let time_var = last_time_var(tree_event.time()?)?;
    match tree_event {
        TreeEvent::Leaf(_) => None,
        TreeEvent::PopulationSizeChange(_) => epoch_events.iter().find(|event| {
            matches!(event, EpochEvent::Epoch(epoch) if last_time_var(&epoch.time) == Some(time_var))
        }),
        TreeEvent::LineageMovement(movement) => epoch_events.iter().find(|event| {
            matches!(event, EpochEvent::Split(split)
                if split.pop_to_div == movement.pop_from
                    && next_epoch_time_var(epoch_events, split) == Some(time_var))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DynamicArg, ParamValue, Variable, VariableKind, VariablePool};

    fn two_pop_model() -> EpochModel {
        let mut pool = VariablePool::new();
        for (name, kind, domain) in [
            ("Nanc", VariableKind::PopulationSize, (100.0, 100_000.0)),
            ("N1", VariableKind::PopulationSize, (100.0, 100_000.0)),
            ("N2_0", VariableKind::PopulationSize, (100.0, 100_000.0)),
            ("N2", VariableKind::PopulationSize, (100.0, 100_000.0)),
            ("T1", VariableKind::Time, (10.0, 10_000.0)),
        ] {
            pool.push(Variable::new(name, kind, domain)).unwrap();
        }
        pool.push(Variable::dynamic("dyn2")).unwrap();

        EpochModel {
            events: vec![
                EpochEvent::Split(Split {
                    pop_to_div: 0,
                    sizes: vec![Expr::var("N1"), Expr::var("N2_0")],
                }),
                EpochEvent::Epoch(Epoch {
                    time: Expr::var("T1"),
                    init_sizes: vec![Expr::var("N1"), Expr::var("N2_0")],
                    final_sizes: vec![Expr::var("N1"), Expr::var("N2")],
                    migration: None,
                    dynamics: vec![
                        DynamicArg::Fixed(Dynamics::Constant),
                        DynamicArg::Var("dyn2".to_string()),
                    ],
                }),
            ],
            variables: pool,
            nanc_size: Some(Expr::var("Nanc")),
            mutation_rate: Some(2.5e-8),
            theta0: None,
        }
    }

    fn two_pop_values() -> Values {
        Values::Vector(vec![
            ParamValue::Num(10_000.0),
            ParamValue::Num(5_000.0),
            ParamValue::Num(1_000.0),
            ParamValue::Num(2_000.0),
            ParamValue::Num(500.0),
            ParamValue::Dynamic(Dynamics::Exponential),
        ])
    }

    #[test]
    fn test_growth_rate_doubling() {
        let rate = growth_rate(100.0, 200.0, 50.0);
        assert!((rate - 2.0_f64.ln() / 50.0).abs() < 1e-15);
    }

    #[test]
    fn test_to_tree_structure() {
        let model = two_pop_model();
        let (tree, _) = model.to_tree(&two_pop_values()).unwrap();

        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].growth, Growth::Zero);
        assert!(matches!(
            &leaves[1].growth,
            Growth::Formula { dyn_name, .. } if dyn_name == "dyn2"
        ));

        let non_leaf: Vec<&TreeEvent> = tree.non_leaf_events().collect();
        assert_eq!(non_leaf.len(), 2);
        assert!(matches!(
            non_leaf[0],
            TreeEvent::PopulationSizeChange(change)
                if change.pop == 1 && change.size == Expr::var("N2_0")
        ));
        assert!(matches!(
            non_leaf[1],
            TreeEvent::LineageMovement(movement)
                if movement.pop == 1
                    && movement.pop_from == 0
                    && movement.size == Expr::var("Nanc")
        ));
    }

    #[test]
    fn test_to_tree_does_not_touch_source() {
        let model = two_pop_model();
        let before = model.events.clone();
        model.to_tree(&two_pop_values()).unwrap();
        assert_eq!(model.events, before);
    }

    #[test]
    fn test_to_tree_rejects_linear_dynamic() {
        let model = two_pop_model();
        let values = Values::Vector(vec![
            ParamValue::Num(10_000.0),
            ParamValue::Num(5_000.0),
            ParamValue::Num(1_000.0),
            ParamValue::Num(2_000.0),
            ParamValue::Num(500.0),
            ParamValue::Dynamic(Dynamics::Linear),
        ]);
        let err = model.to_tree(&values).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedDynamic { pop: 1 }));
    }

    #[test]
    fn test_find_matching_event() {
        let model = two_pop_model();
        let (tree, _) = model.to_tree(&two_pop_values()).unwrap();

        for event in tree.non_leaf_events() {
            let matched = find_matching_event(event, &model.events);
            match event {
                TreeEvent::PopulationSizeChange(_) => {
                    assert!(matches!(matched, Some(EpochEvent::Epoch(_))));
                }
                TreeEvent::LineageMovement(_) => {
                    assert!(matches!(matched, Some(EpochEvent::Split(_))));
                }
                TreeEvent::Leaf(_) => unreachable!(),
            }
        }
    }

    #[test]
    fn test_leaf_has_no_match() {
        let model = two_pop_model();
        let (tree, _) = model.to_tree(&two_pop_values()).unwrap();
        let leaf = tree
            .events
            .iter()
            .find(|event| matches!(event, TreeEvent::Leaf(_)))
            .unwrap();
        assert!(find_matching_event(leaf, &model.events).is_none());
    }

    #[test]
    fn test_unrelated_time_has_no_match() {
        let model = two_pop_model();
        let stray = TreeEvent::PopulationSizeChange(PopulationSizeChange {
            pop: 0,
            time: Expr::var("T9"),
            size: Expr::var("N1"),
            growth: Growth::Zero,
        });
        assert!(find_matching_event(&stray, &model.events).is_none());
    }
}
