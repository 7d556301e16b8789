//! Ordered variable container enforcing name uniqueness.

use std::collections::HashSet;
use std::ops::Range;

use crate::errors::ModelError;
use crate::model::Variable;

/// An ordered collection of [`Variable`]s in which no two members share a
/// name. Every mutating operation validates the incoming items first and
/// leaves the pool unchanged when it would introduce a conflict.
///
/// Cloning produces independent copies of all members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariablePool {
    items: Vec<Variable>,
    names: HashSet<String>,
}

impl VariablePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from variables, failing on the first duplicate name.
    pub fn from_variables<I>(vars: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Variable>,
    {
        let mut pool = Self::new();
        pool.extend(vars)?;
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Variable> {
        self.items.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Variable> {
        self.items.iter().find(|v| v.name() == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Append a variable, failing if its name is already present.
    pub fn push(&mut self, var: Variable) -> Result<(), ModelError> {
        if self.names.contains(var.name()) {
            return Err(ModelError::NameConflict(var.name().to_string()));
        }
        self.names.insert(var.name().to_string());
        self.items.push(var);
        Ok(())
    }

    /// Append several variables. The pool is unchanged when any of them
    /// conflicts with an existing member or with each other.
    pub fn extend<I>(&mut self, vars: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Variable>,
    {
        let incoming: Vec<Variable> = vars.into_iter().collect();
        let mut seen = self.names.clone();
        for var in &incoming {
            if !seen.insert(var.name().to_string()) {
                return Err(ModelError::NameConflict(var.name().to_string()));
            }
        }
        for var in incoming {
            self.names.insert(var.name().to_string());
            self.items.push(var);
        }
        Ok(())
    }

    /// Replace the variable at `index`. A replacement may keep the old name
    /// or introduce a new one not used elsewhere in the pool.
    pub fn set(&mut self, index: usize, var: Variable) -> Result<(), ModelError> {
        let old_name = self.items[index].name().to_string();
        if var.name() != old_name && self.names.contains(var.name()) {
            return Err(ModelError::NameConflict(var.name().to_string()));
        }
        self.names.remove(&old_name);
        self.names.insert(var.name().to_string());
        self.items[index] = var;
        Ok(())
    }

    /// Replace the `range` of members with `replacement` (the
    /// slice-assignment analogue). Names freed by the removed members may be
    /// reused by the replacement; any other collision fails and leaves the
    /// pool unchanged.
    pub fn splice(
        &mut self,
        range: Range<usize>,
        replacement: Vec<Variable>,
    ) -> Result<(), ModelError> {
        let removed: HashSet<String> = self.items[range.clone()]
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        let mut seen: HashSet<String> = HashSet::new();
        for var in &replacement {
            let conflict = !seen.insert(var.name().to_string())
                || (self.names.contains(var.name()) && !removed.contains(var.name()));
            if conflict {
                return Err(ModelError::NameConflict(var.name().to_string()));
            }
        }
        for name in &removed {
            self.names.remove(name);
        }
        for var in &replacement {
            self.names.insert(var.name().to_string());
        }
        self.items.splice(range, replacement);
        Ok(())
    }

    /// Remove and return the variable at `index`.
    pub fn remove(&mut self, index: usize) -> Variable {
        let var = self.items.remove(index);
        self.names.remove(var.name());
        var
    }
}

impl<'a> IntoIterator for &'a VariablePool {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariableKind;

    fn var(name: &str) -> Variable {
        Variable::new(name, VariableKind::PopulationSize, (1.0, 1000.0))
    }

    #[test]
    fn test_push_rejects_duplicate() {
        let mut pool = VariablePool::new();
        pool.push(var("N1")).unwrap();
        let err = pool.push(var("N1")).unwrap_err();
        assert!(matches!(err, ModelError::NameConflict(name) if name == "N1"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_extend_is_atomic() {
        let mut pool = VariablePool::new();
        pool.push(var("N1")).unwrap();
        let err = pool.extend(vec![var("N2"), var("N1")]).unwrap_err();
        assert!(matches!(err, ModelError::NameConflict(_)));
        // N2 must not have been appended before the failure surfaced.
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains_name("N2"));
    }

    #[test]
    fn test_set_allows_same_name() {
        let mut pool = VariablePool::new();
        pool.push(var("N1")).unwrap();
        pool.push(var("N2")).unwrap();
        pool.set(0, Variable::new("N1", VariableKind::Time, (0.0, 1.0)))
            .unwrap();
        assert_eq!(pool.get(0).unwrap().kind(), VariableKind::Time);
        let err = pool.set(0, var("N2")).unwrap_err();
        assert!(matches!(err, ModelError::NameConflict(_)));
    }

    #[test]
    fn test_splice_reuses_removed_names() {
        let mut pool =
            VariablePool::from_variables(vec![var("N1"), var("N2"), var("N3")]).unwrap();
        pool.splice(0..2, vec![var("N2"), var("N4")]).unwrap();
        let names: Vec<&str> = pool.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["N2", "N4", "N3"]);
    }

    #[test]
    fn test_splice_conflict_leaves_pool_unchanged() {
        let mut pool =
            VariablePool::from_variables(vec![var("N1"), var("N2"), var("N3")]).unwrap();
        let err = pool.splice(0..1, vec![var("N3")]).unwrap_err();
        assert!(matches!(err, ModelError::NameConflict(_)));
        let names: Vec<&str> = pool.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["N1", "N2", "N3"]);
    }

    #[test]
    fn test_remove_frees_name() {
        let mut pool = VariablePool::from_variables(vec![var("N1"), var("N2")]).unwrap();
        pool.remove(0);
        pool.push(var("N1")).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut pool = VariablePool::from_variables(vec![var("N1")]).unwrap();
        let copy = pool.clone();
        pool.push(var("N2")).unwrap();
        assert_eq!(copy.len(), 1);
        assert!(copy.contains_name("N1"));
    }
}
