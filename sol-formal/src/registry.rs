#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use sol_ast::Type;

use crate::error::{EncodingError, EntityKind};
use crate::solver::SolverInterface;
use crate::symbolic::{self, SymbolicVariable};

/// Entity → symbolic value map with at-most-once registration.
///
/// The same contract backs variables and expressions (keyed by node id) and
/// global symbols (keyed by name).
#[derive(Clone, Debug)]
pub struct SymbolicRegistry<K> {
    kind: EntityKind,
    entries: HashMap<K, SymbolicVariable>,
}

impl<K> SymbolicRegistry<K>
where
    K: Clone + Eq + Hash + Display,
{
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Builds and stores the value of `key`. Returns `true` when `ty` had to
    /// be abstracted.
    pub fn create(
        &mut self,
        key: K,
        ty: &Type,
        unique_name: String,
        solver: &mut dyn SolverInterface,
    ) -> Result<bool, EncodingError> {
        self.ensure_vacant(&key)?;
        let (abstracted, var) = symbolic::new_symbolic_variable(ty, unique_name, solver);
        if abstracted {
            tracing::warn!(kind = %self.kind, entity = %key, ty = %ty, "type is not supported, value is abstracted");
        } else {
            tracing::debug!(kind = %self.kind, entity = %key, ty = %ty, "created symbolic value");
        }
        self.entries.insert(key, var);
        Ok(abstracted)
    }

    /// Stores a value built by the caller.
    pub fn insert(&mut self, key: K, var: SymbolicVariable) -> Result<(), EncodingError> {
        self.ensure_vacant(&key)?;
        tracing::debug!(kind = %self.kind, entity = %key, name = var.unique_name(), "registered prebuilt symbolic value");
        self.entries.insert(key, var);
        Ok(())
    }

    fn ensure_vacant(&self, key: &K) -> Result<(), EncodingError> {
        if self.entries.contains_key(key) {
            return Err(EncodingError::AlreadyRegistered {
                kind: self.kind,
                entity: key.to_string(),
            });
        }
        Ok(())
    }

    fn not_registered(&self, key: &K) -> EncodingError {
        EncodingError::NotRegistered {
            kind: self.kind,
            entity: key.to_string(),
        }
    }

    pub fn known(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn lookup(&self, key: &K) -> Result<&SymbolicVariable, EncodingError> {
        self.entries.get(key).ok_or_else(|| self.not_registered(key))
    }

    pub fn lookup_mut(&mut self, key: &K) -> Result<&mut SymbolicVariable, EncodingError> {
        match self.entries.get_mut(key) {
            Some(var) => Ok(var),
            None => Err(EncodingError::NotRegistered {
                kind: self.kind,
                entity: key.to_string(),
            }),
        }
    }

    /// Fresh version with an unknown value in the type's range.
    pub fn reset_value(
        &mut self,
        key: &K,
        solver: &mut dyn SolverInterface,
        range_constraints: bool,
    ) -> Result<(), EncodingError> {
        let var = self.lookup_mut(key)?;
        symbolic::set_unknown_value(var, solver, range_constraints);
        tracing::debug!(entity = %key, index = var.index(), "reset to unknown value");
        Ok(())
    }

    pub fn reset_all(&mut self, solver: &mut dyn SolverInterface, range_constraints: bool) {
        self.reset_where(|_, _| true, solver, range_constraints);
    }

    pub fn reset_where(
        &mut self,
        mut predicate: impl FnMut(&K, &SymbolicVariable) -> bool,
        solver: &mut dyn SolverInterface,
        range_constraints: bool,
    ) {
        for (key, var) in self.entries.iter_mut() {
            if predicate(key, var) {
                symbolic::set_unknown_value(var, solver, range_constraints);
            }
        }
    }

    /// Fresh version equal to the type's default.
    pub fn set_zero(&mut self, key: &K, solver: &mut dyn SolverInterface) -> Result<(), EncodingError> {
        let var = self.lookup_mut(key)?;
        symbolic::set_zero_value(var, solver);
        tracing::debug!(entity = %key, index = var.index(), "set to zero value");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &SymbolicVariable)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut SymbolicVariable)> {
        self.entries.iter_mut()
    }
}
