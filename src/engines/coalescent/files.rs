//! Generation of the coalescent simulator's three input files from a
//! tree-based model, plus the observed-SFS filename conventions.

use std::fmt::Write;

use crate::errors::{EngineError, ModelError};
use crate::model::{Bindings, Expr, Growth, TreeEvent, TreeModel};

/// A derived (formula-valued) simulator parameter. Names always carry the
/// `$` suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexParam {
    pub name: String,
    pub definition: String,
}

/// Insertion-ordered table of complex parameters. Registration is
/// idempotent by name: re-deriving the same named quantity for another
/// event keeps the first definition, so repeated derivations cannot drift.
#[derive(Debug, Default)]
pub struct ComplexParamTable {
    entries: Vec<ComplexParam>,
}

impl ComplexParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with `definition` unless the name is already present.
    pub fn register(&mut self, name: &str, definition: &str) {
        if self.entries.iter().any(|p| p.name == name) {
            return;
        }
        self.entries.push(ComplexParam {
            name: name.to_string(),
            definition: definition.to_string(),
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComplexParam> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A derived parameter is real-valued when its name carries the growth
/// marker or its definition divides; everything else is integer-valued.
fn complex_is_int(param: &ComplexParam) -> bool {
    !param.name.contains("dyn") && !param.definition.contains('/')
}

/// The three generated input files, in memory.
#[derive(Debug, Clone)]
pub struct InputFiles {
    pub template: String,
    pub estimation: String,
    pub definitions: String,
}

/// Default per-site mutation rate written into the template block.
pub const DEFAULT_MUTATION_RATE: f64 = 2.5e-8;

/// Build the template, estimation and definition files for `model` at the
/// resolved `bindings`, with sample sizes taken from the observed spectrum.
pub fn generate_input_files(
    model: &TreeModel,
    bindings: &Bindings,
    sample_sizes: &[usize],
    mutation_rate: f64,
) -> Result<InputFiles, EngineError> {
    let mut table = ComplexParamTable::new();
    let template = generate_template(model, sample_sizes, mutation_rate, &mut table)?;
    let estimation = generate_estimation(bindings, &table)?;
    let definitions = generate_definitions(bindings)?;
    Ok(InputFiles {
        template,
        estimation,
        definitions,
    })
}

/// Parameter reference for a size slot: a named variable or a literal.
fn size_param(expr: &Expr) -> Result<String, ModelError> {
    match expr {
        Expr::Var(name) => Ok(format!("{name}$")),
        Expr::Value(x) => Ok(format!("{x}")),
        other => Err(ModelError::GrowthFormulaShape(other.to_formula())),
    }
}

/// Parameter reference for a time slot. A sum of time variables becomes a
/// registered complex parameter named `{v1}_{v2}..sum$`.
fn time_param(expr: &Expr, table: &mut ComplexParamTable) -> Result<String, ModelError> {
    if let Some(vars) = expr.as_sum_of_vars() {
        if vars.len() == 1 {
            return Ok(format!("{}$", vars[0]));
        }
        let name = format!("{}sum$", vars.join("_"));
        let definition = vars
            .iter()
            .map(|v| format!("{v}$"))
            .collect::<Vec<_>>()
            .join(" + ");
        table.register(&name, &definition);
        return Ok(name);
    }
    if let Expr::Value(x) = expr {
        return Ok(format!("{x}"));
    }
    Err(ModelError::GrowthFormulaShape(expr.to_formula()))
}

/// Convert a symbolic growth rate into a registered complex parameter and
/// return its name. The intermediate size ratio gets its own
/// `{Nt}_{N0}div$` entry.
fn growth_param(growth: &Growth, table: &mut ComplexParamTable) -> Result<String, ModelError> {
    let (dyn_name, expr) = match growth {
        Growth::Zero => return Ok("0".to_string()),
        Growth::Formula { dyn_name, expr } => (dyn_name, expr),
    };
    let (nt, n0, time) = match expr {
        Expr::Div(num, time) => match num.as_ref() {
            Expr::Ln(ratio) => match ratio.as_ref() {
                Expr::Div(nt, n0) => match (nt.as_ref(), n0.as_ref()) {
                    (Expr::Var(nt), Expr::Var(n0)) => (nt, n0, time.as_ref()),
                    _ => return Err(ModelError::GrowthFormulaShape(expr.to_formula())),
                },
                _ => return Err(ModelError::GrowthFormulaShape(expr.to_formula())),
            },
            _ => return Err(ModelError::GrowthFormulaShape(expr.to_formula())),
        },
        _ => return Err(ModelError::GrowthFormulaShape(expr.to_formula())),
    };
    let ratio_name = format!("{nt}_{n0}div$");
    table.register(&ratio_name, &format!("{nt}$/{n0}$"));
    let time_name = time_param(time, table)?;
    let name = format!("{dyn_name}$");
    table.register(&name, &format!("log({ratio_name})/{time_name}"));
    Ok(name)
}

fn generate_template(
    model: &TreeModel,
    sample_sizes: &[usize],
    mutation_rate: f64,
    table: &mut ComplexParamTable,
) -> Result<String, EngineError> {
    let leaves = model.leaves();
    let n_pops = leaves.len();
    let mut out = String::new();

    writeln!(out, "//Number of population samples (demes)").unwrap();
    writeln!(out, "{n_pops}").unwrap();

    writeln!(out, "//Population effective sizes (number of genes)").unwrap();
    for leaf in &leaves {
        writeln!(out, "{}", size_param(&leaf.size)?).unwrap();
    }

    writeln!(out, "//Sample sizes").unwrap();
    for size in sample_sizes {
        writeln!(out, "{size}").unwrap();
    }

    writeln!(out, "//Growth rates : negative growth implies population expansion").unwrap();
    for leaf in &leaves {
        writeln!(out, "{}", growth_param(&leaf.growth, table)?).unwrap();
    }

    // Only the trivial zero matrix is emitted; migration rates present on
    // the source model are not carried over.
    writeln!(out, "//Number of migration matrices : 0 implies no migration between demes").unwrap();
    writeln!(out, "1").unwrap();
    writeln!(out, "//Migration matrix 0").unwrap();
    for _ in 0..n_pops {
        let row = vec!["0"; n_pops].join(" ");
        writeln!(out, "{row}").unwrap();
    }

    writeln!(
        out,
        "//historical event: time, source, sink, migrants, new size, new growth rate, migr. matrix"
    )
    .unwrap();
    let events: Vec<&TreeEvent> = model.non_leaf_events().collect();
    writeln!(out, "{} historical event", events.len()).unwrap();
    for event in events {
        let line = match event {
            TreeEvent::PopulationSizeChange(change) => {
                let time = time_param(&change.time, table)?;
                let size = size_param(&change.size)?;
                let growth = growth_param(&change.growth, table)?;
                format!(
                    "{time} {pop} {pop} 0 {size} {growth} 0",
                    pop = change.pop
                )
            }
            TreeEvent::LineageMovement(movement) => {
                let time = time_param(&movement.time, table)?;
                let size = size_param(&movement.size)?;
                format!(
                    "{time} {source} {sink} 1 {size} keep keep",
                    source = movement.pop_from,
                    sink = movement.pop
                )
            }
            TreeEvent::Leaf(_) => {
                return Err(ModelError::WrongEventType {
                    expected: "PopulationSizeChange or LineageMovement",
                    found: "Leaf",
                }
                .into())
            }
        };
        writeln!(out, "{line}").unwrap();
    }

    writeln!(out, "//Number of independent loci [chromosome]").unwrap();
    writeln!(out, "1 0").unwrap();
    writeln!(
        out,
        "//Per chromosome: Number of contiguous linkage Block: a block is a set of contiguous loci"
    )
    .unwrap();
    writeln!(out, "1").unwrap();
    writeln!(
        out,
        "//per Block: data type, num loci, rec. rate and mut rate + optional parameters"
    )
    .unwrap();
    writeln!(out, "FREQ 1 0 {mutation_rate}").unwrap();
    Ok(out)
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn generate_estimation(
    bindings: &Bindings,
    table: &ComplexParamTable,
) -> Result<String, EngineError> {
    let mut out = String::new();
    writeln!(out, "// Search ranges and rules file").unwrap();
    writeln!(out, "// ****************************").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "[PARAMETERS]").unwrap();
    writeln!(out, "//#isInt? #name #dist. #min #max").unwrap();
    for (var, value) in bindings {
        if var.is_dynamic() {
            continue;
        }
        let value = value.as_num(var.name())?;
        let is_int = if value.fract() == 0.0 { 1 } else { 0 };
        let (min, max) = var.domain();
        writeln!(
            out,
            "{is_int} {name}$ unif {min} {max} output bounded",
            name = var.name(),
            min = format_value(min),
            max = format_value(max),
        )
        .unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out, "[RULES]").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "[COMPLEX PARAMETERS]").unwrap();
    for param in table.iter() {
        let is_int = if complex_is_int(param) { 1 } else { 0 };
        writeln!(
            out,
            "{is_int} {name} = {definition} hide",
            name = param.name,
            definition = param.definition,
        )
        .unwrap();
    }
    Ok(out)
}

/// Fixed name/value pairs for the non-dynamic variables: names row, then a
/// values row, tab-separated.
fn generate_definitions(bindings: &Bindings) -> Result<String, EngineError> {
    let mut names = Vec::new();
    let mut values = Vec::new();
    for (var, value) in bindings {
        if var.is_dynamic() {
            continue;
        }
        names.push(format!("{}$", var.name()));
        values.push(format_value(value.as_num(var.name())?));
    }
    Ok(format!("{}\n{}\n", names.join("\t"), values.join("\t")))
}

/// Recognized observed-SFS filename suffixes, per the simulator's naming
/// conventions.
const SFS_SUFFIXES: [&str; 3] = ["DAFpop0.obs", "jointDAFpop1_0.obs", "DSFS.obs"];

/// Replace the base prefix of an observed-SFS filename, preserving the
/// recognized suffix exactly.
pub fn rename_sfs_file(file_name: &str, base_name: &str) -> Result<String, EngineError> {
    for suffix in SFS_SUFFIXES {
        if file_name.ends_with(suffix) {
            return Ok(format!("{base_name}_{suffix}"));
        }
    }
    Err(EngineError::SfsFileName(file_name.to_string()))
}

/// A joint/multidimensional observed SFS needs the simulator's multi-SFS
/// flag.
pub fn is_multi_sfs(file_name: &str) -> bool {
    file_name.contains("DSFS") || file_name.contains("MSFS")
}
