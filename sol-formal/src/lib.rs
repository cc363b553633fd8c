#![forbid(unsafe_code)]

//! SMT encoding context of the formal-verification pass.
//!
//! Gives every mutable program entity an SSA-versioned symbolic identity,
//! records index tables and whole-context snapshots at control-flow nodes,
//! and models value transfer between accounts as solver constraints.

pub mod blockchain;
pub mod context;
pub mod error;
pub mod registry;
pub mod settings;
pub mod solver;
pub mod ssa_tracker;
pub mod symbolic;

pub use blockchain::BlockchainModel;
pub use context::EncodingContext;
pub use error::{EncodingError, EntityKind, SettingsError, SolverError};
pub use registry::SymbolicRegistry;
pub use settings::EncodingSettings;
pub use solver::{
    shared, CheckResult, Expression, SharedSolver, SmtLib2Interface, SmtProfile, SolverInterface, Sort,
};
#[cfg(feature = "z3")]
pub use solver::z3_interface::Z3Interface;
pub use ssa_tracker::{SsaTracker, VariableIndices};
pub use symbolic::{is_supported_type, new_symbolic_variable, SymbolicKind, SymbolicVariable};
