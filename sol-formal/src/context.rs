#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use sol_ast::{Expression as AstExpression, NodeId, VariableDeclaration};

use crate::blockchain::BlockchainModel;
use crate::error::{EncodingError, EntityKind};
use crate::registry::SymbolicRegistry;
use crate::settings::EncodingSettings;
use crate::solver::{Expression, SharedSolver};
use crate::ssa_tracker::{SsaTracker, VariableIndices};
use crate::symbolic::{self, SymbolicVariable};

/// Stores the state of the SMT encoding.
///
/// Cloning yields an independent copy of every registry and table; only the
/// solver handle, the per-variable index allocators and already saved
/// intermediate contexts are shared.
#[derive(Clone)]
pub struct EncodingContext {
    solver: SharedSolver,
    settings: EncodingSettings,

    variables: SymbolicRegistry<NodeId>,
    declarations: HashMap<NodeId, VariableDeclaration>,
    expressions: SymbolicRegistry<NodeId>,
    global_symbols: SymbolicRegistry<String>,

    ssa: SsaTracker,
    intermediate_contexts: HashMap<NodeId, Rc<EncodingContext>>,

    /// Last saved constraints. Overwritten, never accumulated.
    constraints: Expression,

    blockchain: BlockchainModel,
}

impl EncodingContext {
    pub fn new(solver: SharedSolver) -> Self {
        Self::with_settings(solver, EncodingSettings::default())
    }

    pub fn with_settings(solver: SharedSolver, settings: EncodingSettings) -> Self {
        let blockchain = BlockchainModel::new(&mut *solver.borrow_mut());
        Self {
            solver,
            settings,
            variables: SymbolicRegistry::new(EntityKind::Variable),
            declarations: HashMap::new(),
            expressions: SymbolicRegistry::new(EntityKind::Expression),
            global_symbols: SymbolicRegistry::new(EntityKind::GlobalSymbol),
            ssa: SsaTracker::new(),
            intermediate_contexts: HashMap::new(),
            constraints: Expression::boolean(true),
            blockchain,
        }
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    pub fn solver(&self) -> &SharedSolver {
        &self.solver
    }

    /// Drops every registered entity and snapshot. The solver itself is not
    /// reset; that belongs to whoever owns its assertion stack.
    pub fn reset(&mut self) {
        self.variables.clear();
        self.declarations.clear();
        self.expressions.clear();
        self.global_symbols.clear();
        self.ssa.clear();
        self.intermediate_contexts.clear();
        self.constraints = Expression::boolean(true);
        self.blockchain.reset(&mut *self.solver.borrow_mut());
        tracing::debug!("encoding context reset");
    }

    // Variables.

    pub fn variable(&self, decl: &VariableDeclaration) -> Result<&SymbolicVariable, EncodingError> {
        self.variables.lookup(&decl.id)
    }

    pub fn variables(&self) -> &SymbolicRegistry<NodeId> {
        &self.variables
    }

    /// Creates the symbolic variable of `decl`.
    /// Returns `true` if its type is not supported and was abstracted.
    pub fn create_variable(&mut self, decl: &VariableDeclaration) -> Result<bool, EncodingError> {
        let unique_name = format!("{}_{}", decl.name.node, decl.id.0);
        let abstracted = self.variables.create(
            decl.id,
            &decl.ty,
            unique_name,
            &mut *self.solver.borrow_mut(),
        )?;
        self.declarations.insert(decl.id, decl.clone());
        Ok(abstracted)
    }

    pub fn known_variable(&self, decl: &VariableDeclaration) -> bool {
        self.variables.known(&decl.id)
    }

    pub fn reset_variable(&mut self, decl: &VariableDeclaration) -> Result<(), EncodingError> {
        self.set_unknown_value(decl)
    }

    /// Resets every listed variable, or none of them if one is unknown.
    pub fn reset_variables(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Result<(), EncodingError> {
        let ids = ids.into_iter().collect::<Vec<_>>();
        if let Some(missing) = ids.iter().find(|id| !self.variables.known(id)) {
            return Err(EncodingError::NotRegistered {
                kind: EntityKind::Variable,
                entity: missing.to_string(),
            });
        }
        let mut solver = self.solver.borrow_mut();
        for id in ids {
            self.variables
                .reset_value(&id, &mut *solver, self.settings.range_constraints)?;
        }
        Ok(())
    }

    pub fn reset_variables_where(&mut self, filter: impl Fn(&VariableDeclaration) -> bool) {
        let declarations = &self.declarations;
        self.variables.reset_where(
            |id, _| declarations.get(id).is_some_and(&filter),
            &mut *self.solver.borrow_mut(),
            self.settings.range_constraints,
        );
    }

    pub fn reset_all_variables(&mut self) {
        self.variables
            .reset_all(&mut *self.solver.borrow_mut(), self.settings.range_constraints);
    }

    pub fn reset_all_expressions(&mut self) {
        self.expressions.clear();
    }

    /// Allocates a new index for the declaration, updates the current index
    /// to it and returns the new value.
    pub fn new_value(&mut self, decl: &VariableDeclaration) -> Result<Expression, EncodingError> {
        let var = self.variables.lookup_mut(&decl.id)?;
        Ok(SsaTracker::new_value(var, &mut *self.solver.borrow_mut()))
    }

    pub fn set_zero_value(&mut self, decl: &VariableDeclaration) -> Result<(), EncodingError> {
        self.variables.set_zero(&decl.id, &mut *self.solver.borrow_mut())
    }

    pub fn set_zero_value_of(&self, var: &mut SymbolicVariable) {
        symbolic::set_zero_value(var, &mut *self.solver.borrow_mut());
    }

    /// Resets the variable to an unknown value in its range.
    pub fn set_unknown_value(&mut self, decl: &VariableDeclaration) -> Result<(), EncodingError> {
        self.variables.reset_value(
            &decl.id,
            &mut *self.solver.borrow_mut(),
            self.settings.range_constraints,
        )
    }

    pub fn set_unknown_value_of(&self, var: &mut SymbolicVariable) {
        symbolic::set_unknown_value(
            var,
            &mut *self.solver.borrow_mut(),
            self.settings.range_constraints,
        );
    }

    // Expressions.

    pub fn expression(&self, e: &AstExpression) -> Result<&SymbolicVariable, EncodingError> {
        self.expressions.lookup(&e.id)
    }

    pub fn expressions(&self) -> &SymbolicRegistry<NodeId> {
        &self.expressions
    }

    /// Creates the symbolic value of `e` (value can be arbitrary).
    /// Returns `true` if its type is not supported.
    pub fn create_expression(&mut self, e: &AstExpression) -> Result<bool, EncodingError> {
        self.expressions.create(
            e.id,
            &e.ty,
            format!("expr_{}", e.id.0),
            &mut *self.solver.borrow_mut(),
        )
    }

    /// Registers `e` with a value built elsewhere, typically the value of a
    /// sub-expression. Nothing is abstracted, so this returns `false`.
    pub fn create_expression_with(
        &mut self,
        e: &AstExpression,
        value: SymbolicVariable,
    ) -> Result<bool, EncodingError> {
        self.expressions.insert(e.id, value)?;
        Ok(false)
    }

    pub fn known_expression(&self, e: &AstExpression) -> bool {
        self.expressions.known(&e.id)
    }

    // Global variables and functions.

    pub fn global_symbol(&self, name: &str) -> Result<&SymbolicVariable, EncodingError> {
        self.global_symbols.lookup(&name.to_string())
    }

    pub fn global_symbols(&self) -> &SymbolicRegistry<String> {
        &self.global_symbols
    }

    /// Defines a built-in variable or function typed like `e`.
    /// Returns `true` if the type was abstracted.
    pub fn create_global_symbol(&mut self, name: &str, e: &AstExpression) -> Result<bool, EncodingError> {
        self.global_symbols.create(
            name.to_string(),
            &e.ty,
            name.to_string(),
            &mut *self.solver.borrow_mut(),
        )
    }

    pub fn known_global_symbol(&self, name: &str) -> bool {
        self.global_symbols.known(&name.to_string())
    }

    // SSA.

    pub fn copy_variable_indices(&self) -> VariableIndices {
        SsaTracker::copy_indices(&self.variables)
    }

    /// Appends the current indices to the ones already saved at `node`.
    pub fn save_variable_indices(&mut self, node: NodeId) {
        self.ssa.save_indices(node, &self.variables);
    }

    pub fn ssa_indices(&self, node: NodeId) -> Result<&[VariableIndices], EncodingError> {
        self.ssa.indices_at(node)
    }

    pub fn restore_variable_indices(&mut self, indices: &VariableIndices) {
        SsaTracker::restore_indices(&mut self.variables, indices);
    }

    /// Phi constraints joining two branches; see [`SsaTracker::merge_indices`].
    /// The caller asserts them.
    pub fn merge_variable_indices(
        &mut self,
        condition: &Expression,
        true_indices: &VariableIndices,
        false_indices: &VariableIndices,
    ) -> Vec<Expression> {
        SsaTracker::merge_indices(
            &mut self.variables,
            condition,
            true_indices,
            false_indices,
            &mut *self.solver.borrow_mut(),
        )
    }

    // Solver constraints.

    pub fn save_constraints(&mut self, constraints: Expression) {
        self.constraints = constraints;
    }

    pub fn constraints(&self) -> &Expression {
        &self.constraints
    }

    // Intermediate contexts.

    /// Stores a copy of the whole context at `node`, replacing any earlier one.
    pub fn save_intermediate_context(&mut self, node: NodeId) {
        let snapshot = Rc::new(self.clone());
        tracing::debug!(%node, variables = self.variables.len(), "saved intermediate context");
        self.intermediate_contexts.insert(node, snapshot);
    }

    pub fn intermediate_context(&self, node: NodeId) -> Result<EncodingContext, EncodingError> {
        self.intermediate_contexts
            .get(&node)
            .map(|ctx| ctx.as_ref().clone())
            .ok_or(EncodingError::NoIntermediateContext { node })
    }

    // Blockchain.

    pub fn this_address(&mut self) -> Expression {
        self.blockchain.this_address(&mut *self.solver.borrow_mut())
    }

    /// Balance of `this`.
    pub fn balance(&mut self) -> Expression {
        self.blockchain.balance(&mut *self.solver.borrow_mut())
    }

    pub fn balance_of(&self, address: Expression) -> Expression {
        self.blockchain.balance_of(address)
    }

    pub fn blockchain(&self) -> &BlockchainModel {
        &self.blockchain
    }

    pub fn transfer(&mut self, from: Expression, to: Expression, value: Expression) {
        self.blockchain
            .transfer(from, to, value, &mut *self.solver.borrow_mut());
    }
}

impl fmt::Debug for EncodingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingContext")
            .field("settings", &self.settings)
            .field("variables", &self.variables.len())
            .field("expressions", &self.expressions.len())
            .field("global_symbols", &self.global_symbols.len())
            .field("intermediate_contexts", &self.intermediate_contexts.len())
            .field("constraints", &self.constraints.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{shared, SmtLib2Interface, Sort};
    use sol_ast::{span, NodeIdGen, Type};

    fn context() -> (EncodingContext, NodeIdGen) {
        (EncodingContext::new(shared(SmtLib2Interface::new())), NodeIdGen::new())
    }

    #[test]
    fn unique_names_combine_name_and_id() {
        let (mut ctx, mut ids) = context();
        let x = VariableDeclaration::local(ids.next_id(), span(0, 1), "x", Type::uint(256));
        assert!(!ctx.create_variable(&x).expect("create"));
        assert_eq!(ctx.variable(&x).expect("x").current_name(), "x_0_0");
    }

    #[test]
    fn constraints_slot_is_last_write_wins() {
        let (mut ctx, _) = context();
        assert_eq!(ctx.constraints(), &Expression::boolean(true));
        let a = Expression::variable("a_0", Sort::Bool);
        let b = Expression::variable("b_0", Sort::Bool);
        ctx.save_constraints(a);
        ctx.save_constraints(b.clone());
        assert_eq!(ctx.constraints(), &b);
    }

    #[test]
    fn intermediate_context_is_overwritten_per_node() {
        let (mut ctx, mut ids) = context();
        let node = ids.next_id();
        let x = VariableDeclaration::local(ids.next_id(), span(0, 1), "x", Type::uint(8));
        ctx.create_variable(&x).expect("create");

        ctx.save_intermediate_context(node);
        ctx.new_value(&x).expect("new value");
        ctx.save_intermediate_context(node);

        let restored = ctx.intermediate_context(node).expect("saved");
        assert_eq!(restored.variable(&x).expect("x").index(), 1);
    }

    #[test]
    fn missing_intermediate_context_is_an_error() {
        let (ctx, _) = context();
        assert!(matches!(
            ctx.intermediate_context(NodeId(7)),
            Err(EncodingError::NoIntermediateContext { node: NodeId(7) })
        ));
    }

    #[test]
    fn reset_variables_where_filters_on_declarations() {
        let (mut ctx, mut ids) = context();
        let owner = VariableDeclaration::state(ids.next_id(), span(0, 5), "owner", Type::address());
        let tmp = VariableDeclaration::local(ids.next_id(), span(6, 3), "tmp", Type::uint(8));
        ctx.create_variable(&owner).expect("owner");
        ctx.create_variable(&tmp).expect("tmp");

        ctx.reset_variables_where(|d| d.is_state_variable);

        assert_eq!(ctx.variable(&owner).expect("owner").index(), 1);
        assert_eq!(ctx.variable(&tmp).expect("tmp").index(), 0);
    }
}
