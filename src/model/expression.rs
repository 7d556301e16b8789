//! Small expression tree for formula-valued model quantities.
//!
//! Growth rates and event times are sometimes numbers and sometimes formulas
//! over named variables (e.g. `log(Nt/N0)/t`). Representing them as a sum
//! type with two interpreters — numeric evaluation against concrete
//! bindings, and serialization to the coalescent simulator's formula syntax
//! — keeps both paths out of ad hoc string code.

use std::collections::HashMap;

use crate::errors::ModelError;

/// A formula over named variables and literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Value(f64),
    Var(String),
    Add(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Ln(Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Expr::Div(Box::new(lhs), Box::new(rhs))
    }

    pub fn ln(inner: Expr) -> Self {
        Expr::Ln(Box::new(inner))
    }

    /// Evaluate against concrete variable bindings.
    pub fn eval(&self, bindings: &HashMap<String, f64>) -> Result<f64, ModelError> {
        match self {
            Expr::Value(x) => Ok(*x),
            Expr::Var(name) => bindings
                .get(name)
                .copied()
                .ok_or_else(|| ModelError::UnknownVariable(name.clone())),
            Expr::Add(lhs, rhs) => Ok(lhs.eval(bindings)? + rhs.eval(bindings)?),
            Expr::Div(lhs, rhs) => Ok(lhs.eval(bindings)? / rhs.eval(bindings)?),
            Expr::Ln(inner) => Ok(inner.eval(bindings)?.ln()),
        }
    }

    /// Render in the coalescent simulator's formula syntax: variables carry
    /// a `$` suffix, natural log is spelled `log`.
    pub fn to_formula(&self) -> String {
        match self {
            Expr::Value(x) => format!("{x}"),
            Expr::Var(name) => format!("{name}$"),
            Expr::Add(lhs, rhs) => format!("{} + {}", lhs.to_formula(), rhs.to_formula()),
            Expr::Div(lhs, rhs) => format!("{}/{}", lhs.to_formula(), rhs.to_formula()),
            Expr::Ln(inner) => format!("log({})", inner.to_formula()),
        }
    }

    /// Variable names in left-to-right order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Value(_) => {}
            Expr::Var(name) => names.push(name),
            Expr::Add(lhs, rhs) | Expr::Div(lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Expr::Ln(inner) => inner.collect_variables(names),
        }
    }

    /// The variable names of an expression that is a pure sum of variables
    /// (a single variable counts), or `None` for any other shape.
    pub fn as_sum_of_vars(&self) -> Option<Vec<&str>> {
        match self {
            Expr::Var(name) => Some(vec![name]),
            Expr::Add(lhs, rhs) => {
                let mut names = lhs.as_sum_of_vars()?;
                names.extend(rhs.as_sum_of_vars()?);
                Some(names)
            }
            _ => None,
        }
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::Value(x)
    }
}
