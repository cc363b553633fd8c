#![forbid(unsafe_code)]

use sol_ast::Type;

use crate::solver::{Expression, SolverInterface};
use crate::symbolic::{self, SymbolicVariable};

const THIS_ADDRESS: &str = "this";
const BALANCES: &str = "balances";

/// The executing contract's address and the `address -> balance` map.
///
/// Balances are one SSA-versioned array; every transfer produces new
/// versions, never an in-place update.
#[derive(Clone, Debug)]
pub struct BlockchainModel {
    this_address: Option<SymbolicVariable>,
    balances: SymbolicVariable,
    /// Version of `this` picked by the last reset, promoted on first use.
    pending_this: Option<SymbolicVariable>,
}

impl BlockchainModel {
    pub fn new(solver: &mut dyn SolverInterface) -> Self {
        let (_, balances) = symbolic::new_symbolic_variable(
            &Type::mapping(Type::address(), Type::uint(256)),
            BALANCES,
            solver,
        );
        Self {
            this_address: None,
            balances,
            pending_this: None,
        }
    }

    /// Symbolic address of the contract being encoded.
    pub fn this_address(&mut self, solver: &mut dyn SolverInterface) -> Expression {
        if let Some(this) = &self.this_address {
            return this.current_value();
        }
        let this = match self.pending_this.take() {
            Some(pending) => pending,
            None => symbolic::new_symbolic_variable(&Type::address(), THIS_ADDRESS, solver).1,
        };
        tracing::debug!(name = %this.current_name(), "created `this` address");
        let value = this.current_value();
        self.this_address = Some(this);
        value
    }

    pub fn balance(&mut self, solver: &mut dyn SolverInterface) -> Expression {
        let this = self.this_address(solver);
        self.balance_of(this)
    }

    /// Balance of an arbitrary address in the current balances version.
    pub fn balance_of(&self, address: Expression) -> Expression {
        Expression::select(self.balances.current_value(), address)
    }

    pub fn balances(&self) -> &SymbolicVariable {
        &self.balances
    }

    /// Moves `value` from `from` to `to`.
    ///
    /// Adds no overflow, underflow or distinctness constraints; a
    /// self-transfer still produces two chained versions.
    pub fn transfer(
        &mut self,
        from: Expression,
        to: Expression,
        value: Expression,
        solver: &mut dyn SolverInterface,
    ) {
        tracing::debug!(%from, %to, %value, "transfer");
        self.add_balance(to, value.clone(), solver);
        self.add_balance(from, -value, solver);
    }

    fn add_balance(&mut self, account: Expression, delta: Expression, solver: &mut dyn SolverInterface) {
        let old = self.balances.current_value();
        let updated = Expression::store(
            old.clone(),
            account.clone(),
            Expression::select(old, account) + delta,
        );
        let next = self.balances.increase_index(solver);
        solver.add_assertion(&next.equals(updated));
    }

    /// Forgets the current `this` address and balances; later queries see
    /// fresh, unconstrained constants.
    ///
    /// The next `this` version is chosen here, not on first use, so every
    /// context cloned after the reset agrees on it.
    pub fn reset(&mut self, solver: &mut dyn SolverInterface) {
        if let Some(mut this) = self.this_address.take() {
            this.increase_index(solver);
            self.pending_this = Some(this);
        }
        self.balances.increase_index(solver);
    }
}
