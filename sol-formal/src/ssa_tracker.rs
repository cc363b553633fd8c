#![forbid(unsafe_code)]

use std::collections::HashMap;

use sol_ast::NodeId;

use crate::error::EncodingError;
use crate::registry::SymbolicRegistry;
use crate::solver::{Expression, SolverInterface};
use crate::symbolic::{SymbolicKind, SymbolicVariable};

/// Current SSA index of every variable, keyed by declaration.
pub type VariableIndices = HashMap<NodeId, u32>;

/// SSA index tables recorded at control-flow nodes.
///
/// Append-only: a node visited several times keeps every recorded table, in
/// recording order.
#[derive(Clone, Debug, Default)]
pub struct SsaTracker {
    saved: HashMap<NodeId, Vec<VariableIndices>>,
}

impl SsaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single write primitive: moves `var` to a fresh version.
    pub fn new_value(var: &mut SymbolicVariable, solver: &mut dyn SolverInterface) -> Expression {
        let value = var.increase_index(solver);
        tracing::debug!(name = var.unique_name(), index = var.index(), "new SSA value");
        value
    }

    pub fn copy_indices(variables: &SymbolicRegistry<NodeId>) -> VariableIndices {
        variables.iter().map(|(id, var)| (*id, var.index())).collect()
    }

    pub fn save_indices(&mut self, node: NodeId, variables: &SymbolicRegistry<NodeId>) {
        let indices = Self::copy_indices(variables);
        let saved = self.saved.entry(node).or_default();
        saved.push(indices);
        tracing::debug!(%node, snapshots = saved.len(), "saved SSA indices");
    }

    pub fn indices_at(&self, node: NodeId) -> Result<&[VariableIndices], EncodingError> {
        self.saved
            .get(&node)
            .map(Vec::as_slice)
            .ok_or(EncodingError::NoSavedIndices { node })
    }

    /// Points every variable listed in `indices` back at its recorded version.
    /// Variables created after the table was taken are left alone.
    pub fn restore_indices(variables: &mut SymbolicRegistry<NodeId>, indices: &VariableIndices) {
        for (id, var) in variables.iter_mut() {
            if let Some(index) = indices.get(id) {
                var.set_index(*index);
            }
        }
    }

    /// Joins two branches: every variable whose index differs between
    /// `true_indices` and `false_indices` gets a fresh version, and the
    /// returned constraints tie it to the value of the branch taken.
    ///
    /// Variables missing from either table are skipped. Function-typed
    /// variables get a fresh version but no constraint. The constraints are
    /// ordered by declaration id.
    pub fn merge_indices(
        variables: &mut SymbolicRegistry<NodeId>,
        condition: &Expression,
        true_indices: &VariableIndices,
        false_indices: &VariableIndices,
        solver: &mut dyn SolverInterface,
    ) -> Vec<Expression> {
        let mut ids = variables.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        ids.sort();

        let mut merged = Vec::new();
        for id in ids {
            let (Some(&t), Some(&f)) = (true_indices.get(&id), false_indices.get(&id)) else {
                continue;
            };
            if t == f {
                continue;
            }
            let Ok(var) = variables.lookup_mut(&id) else {
                continue;
            };
            let then_value = var.value_at_index(t);
            let else_value = var.value_at_index(f);
            let joined = Self::new_value(var, solver);
            // Function symbols cannot be compared; the joined version stays
            // unconstrained.
            if matches!(var.kind(), SymbolicKind::Function { .. }) {
                continue;
            }
            merged.push(joined.equals(Expression::ite(condition.clone(), then_value, else_value)));
        }
        merged
    }

    pub fn clear(&mut self) {
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntityKind;
    use crate::solver::{SmtLib2Interface, Sort};
    use sol_ast::Type;

    fn two_vars() -> (SymbolicRegistry<NodeId>, SmtLib2Interface) {
        let mut solver = SmtLib2Interface::new();
        let mut vars = SymbolicRegistry::new(EntityKind::Variable);
        vars.create(NodeId(1), &Type::uint(256), "x_1".into(), &mut solver)
            .expect("x");
        vars.create(NodeId(2), &Type::Bool, "b_2".into(), &mut solver)
            .expect("b");
        (vars, solver)
    }

    #[test]
    fn saved_indices_accumulate_in_order() {
        let (mut vars, mut solver) = two_vars();
        let mut tracker = SsaTracker::new();

        tracker.save_indices(NodeId(10), &vars);
        SsaTracker::new_value(vars.lookup_mut(&NodeId(1)).expect("x"), &mut solver);
        tracker.save_indices(NodeId(10), &vars);

        let saved = tracker.indices_at(NodeId(10)).expect("saved");
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0][&NodeId(1)], 0);
        assert_eq!(saved[1][&NodeId(1)], 1);
        assert_eq!(saved[1][&NodeId(2)], 0);
    }

    #[test]
    fn indices_at_unsaved_node_fails() {
        let tracker = SsaTracker::new();
        assert!(matches!(
            tracker.indices_at(NodeId(4)),
            Err(EncodingError::NoSavedIndices { node: NodeId(4) })
        ));
    }

    #[test]
    fn restore_then_new_value_does_not_reuse_indices() {
        let (mut vars, mut solver) = two_vars();
        let before = SsaTracker::copy_indices(&vars);
        let x = vars.lookup_mut(&NodeId(1)).expect("x");
        SsaTracker::new_value(x, &mut solver);
        SsaTracker::new_value(x, &mut solver);

        SsaTracker::restore_indices(&mut vars, &before);
        let x = vars.lookup_mut(&NodeId(1)).expect("x");
        assert_eq!(x.index(), 0);
        let fresh = SsaTracker::new_value(x, &mut solver);
        assert_eq!(fresh.var_name(), Some("x_1_3"));
    }

    #[test]
    fn merge_creates_phi_constraints_for_diverging_variables() {
        let (mut vars, mut solver) = two_vars();
        let base = SsaTracker::copy_indices(&vars);

        SsaTracker::new_value(vars.lookup_mut(&NodeId(1)).expect("x"), &mut solver);
        let after_then = SsaTracker::copy_indices(&vars);
        SsaTracker::restore_indices(&mut vars, &base);

        let cond = Expression::variable("c_0", Sort::Bool);
        let merged = SsaTracker::merge_indices(&mut vars, &cond, &after_then, &base, &mut solver);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].to_string(), "(= x_1_2 (ite c_0 x_1_1 x_1_0))");
        assert_eq!(vars.lookup(&NodeId(1)).expect("x").index(), 2);
        assert_eq!(vars.lookup(&NodeId(2)).expect("b").index(), 0);
    }

    #[test]
    fn merge_advances_function_variables_without_constraints() {
        let mut solver = SmtLib2Interface::new();
        let mut vars = SymbolicRegistry::new(EntityKind::Variable);
        let ty = Type::Function {
            params: vec![Type::uint(8)],
            returns: vec![Type::Bool],
        };
        vars.create(NodeId(0), &ty, "f_0".into(), &mut solver)
            .expect("f");
        let base = SsaTracker::copy_indices(&vars);

        SsaTracker::new_value(vars.lookup_mut(&NodeId(0)).expect("f"), &mut solver);
        let after_then = SsaTracker::copy_indices(&vars);
        SsaTracker::restore_indices(&mut vars, &base);

        let cond = Expression::variable("c_0", Sort::Bool);
        let merged = SsaTracker::merge_indices(&mut vars, &cond, &after_then, &base, &mut solver);

        assert!(merged.is_empty());
        assert_eq!(vars.lookup(&NodeId(0)).expect("f").index(), 2);
        assert!(solver.is_declared("f_0_2"));
    }
}
