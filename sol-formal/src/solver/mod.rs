#![forbid(unsafe_code)]

//! Boundary to the SMT backend.
//!
//! The encoder only ever declares constants and adds assertions; checking is
//! left to whoever drives the solver.

use std::cell::RefCell;
use std::rc::Rc;

mod expression;
mod smtlib2;
#[cfg(feature = "z3")]
pub mod z3_interface;

pub use expression::{Expression, Op, Sort, Term};
pub use smtlib2::SmtLib2Interface;

use crate::error::SolverError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckResult {
    Satisfiable,
    Unsatisfiable,
    Unknown,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtProfile {
    /// Very low timeouts.
    #[default]
    Fast,
    /// CI-friendly medium timeouts.
    Ci,
    /// Higher timeouts.
    Thorough,
}

impl SmtProfile {
    pub fn timeout_ms(self) -> u32 {
        match self {
            SmtProfile::Fast => 50,
            SmtProfile::Ci => 250,
            SmtProfile::Thorough => 2_000,
        }
    }
}

pub trait SolverInterface {
    fn reset(&mut self);

    fn push(&mut self);

    fn pop(&mut self) -> Result<(), SolverError>;

    /// Declares a constant (or function symbol) once; redeclaring the same
    /// name with the same sort is a no-op.
    fn declare_variable(&mut self, name: &str, sort: &Sort);

    fn add_assertion(&mut self, expr: &Expression);

    /// Checks the current assertion stack and evaluates `expressions` in the
    /// model when satisfiable.
    fn check(&mut self, expressions: &[Expression]) -> (CheckResult, Vec<String>);
}

/// Solver handle shared between a context and its snapshots.
pub type SharedSolver = Rc<RefCell<dyn SolverInterface>>;

pub fn shared<S: SolverInterface + 'static>(solver: S) -> SharedSolver {
    Rc::new(RefCell::new(solver))
}
